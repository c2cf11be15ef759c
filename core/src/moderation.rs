use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::profiles::ParseEnumError;

/// Clean score at or above this passes without review.
pub const PASS_THRESHOLD: f64 = 0.8;
/// Clean score at or above this (but below pass) is held for manual review.
pub const FLAG_THRESHOLD: f64 = 0.6;

/// Text fields subject to automated moderation. Everything else on the
/// profile writes directly.
pub const MODERATED_TEXT_FIELDS: &[&str] =
    &["display_name", "headline", "about", "services_description"];

/// Automated content-safety classification applied before human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AutoModeration {
    Draft,
    AutoPassed,
    AutoFlagged,
    AutoBlocked,
}

impl AutoModeration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::AutoPassed => "auto_passed",
            Self::AutoFlagged => "auto_flagged",
            Self::AutoBlocked => "auto_blocked",
        }
    }
}

impl FromStr for AutoModeration {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "auto_passed" => Ok(Self::AutoPassed),
            "auto_flagged" => Ok(Self::AutoFlagged),
            "auto_blocked" => Ok(Self::AutoBlocked),
            other => Err(ParseEnumError {
                field: "auto_moderation",
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome of classifying one piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModerationOutcome {
    AutoPassed,
    AutoFlagged,
    AutoBlocked,
}

impl From<ModerationOutcome> for AutoModeration {
    fn from(outcome: ModerationOutcome) -> Self {
        match outcome {
            ModerationOutcome::AutoPassed => Self::AutoPassed,
            ModerationOutcome::AutoFlagged => Self::AutoFlagged,
            ModerationOutcome::AutoBlocked => Self::AutoBlocked,
        }
    }
}

/// Clean score: 1 minus the worst per-category risk score. Scores outside
/// [0,1] are clamped before the subtraction.
pub fn clean_score(category_scores: &[(String, f64)]) -> f64 {
    let max_risk = category_scores
        .iter()
        .map(|(_, score)| score.clamp(0.0, 1.0))
        .fold(0.0_f64, f64::max);
    1.0 - max_risk
}

/// Classify a clean score into exactly one outcome. The 0.8 boundary passes
/// and the 0.6 boundary flags; both comparisons are inclusive so the rule is
/// the same for text and image paths.
pub fn classify(clean: f64) -> ModerationOutcome {
    if clean >= PASS_THRESHOLD {
        ModerationOutcome::AutoPassed
    } else if clean >= FLAG_THRESHOLD {
        ModerationOutcome::AutoFlagged
    } else {
        ModerationOutcome::AutoBlocked
    }
}

/// Categories whose risk score pushed the content below the pass threshold.
pub fn flagged_categories(category_scores: &[(String, f64)]) -> Vec<String> {
    let mut flagged: Vec<String> = category_scores
        .iter()
        .filter(|(_, score)| 1.0 - score.clamp(0.0, 1.0) < PASS_THRESHOLD)
        .map(|(category, _)| category.clone())
        .collect();
    flagged.sort();
    flagged
}

pub fn is_moderated_text_field(field: &str) -> bool {
    MODERATED_TEXT_FIELDS.contains(&field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(c, s)| (c.to_string(), *s)).collect()
    }

    #[test]
    fn clean_score_uses_worst_category() {
        let s = scores(&[("nudity", 0.1), ("weapon", 0.35), ("gore", 0.02)]);
        assert!((clean_score(&s) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn clean_score_of_empty_scores_is_one() {
        assert_eq!(clean_score(&[]), 1.0);
    }

    #[test]
    fn classification_is_total_over_clean_score() {
        assert_eq!(classify(0.95), ModerationOutcome::AutoPassed);
        assert_eq!(classify(0.7), ModerationOutcome::AutoFlagged);
        assert_eq!(classify(0.3), ModerationOutcome::AutoBlocked);
    }

    #[test]
    fn pass_boundary_is_inclusive() {
        assert_eq!(classify(0.8), ModerationOutcome::AutoPassed);
    }

    #[test]
    fn flag_boundary_is_inclusive() {
        assert_eq!(classify(0.6), ModerationOutcome::AutoFlagged);
        assert_eq!(classify(0.55), ModerationOutcome::AutoBlocked);
    }

    #[test]
    fn flagged_categories_lists_every_offender() {
        let s = scores(&[("nudity", 0.7), ("offensive", 0.25), ("gore", 0.01)]);
        assert_eq!(flagged_categories(&s), vec!["nudity", "offensive"]);
    }

    #[test]
    fn moderated_field_allow_list() {
        assert!(is_moderated_text_field("about"));
        assert!(is_moderated_text_field("display_name"));
        assert!(!is_moderated_text_field("city"));
        assert!(!is_moderated_text_field("slug"));
    }
}
