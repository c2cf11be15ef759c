//! Moderation provider client.
//!
//! Classification itself is pure (`mm_core::moderation`); this module owns
//! the provider round-trip and the fail-safe: any provider failure degrades
//! to `auto_flagged` so unchecked content is never silently published and a
//! provider outage never rejects a user's content outright.

use std::collections::HashMap;

use serde::Deserialize;

use mm_core::moderation::{ModerationOutcome, classify, clean_score, flagged_categories};

use crate::state::ModerationConfig;

pub const SERVICE_UNAVAILABLE_REASON: &str =
    "Automated moderation was unavailable; content is held for manual review";

/// Result of moderating one piece of content.
#[derive(Debug, Clone)]
pub struct ModerationReview {
    pub outcome: ModerationOutcome,
    /// Absent when the provider could not be reached.
    pub clean_score: Option<f64>,
    pub reasons: Vec<String>,
}

impl ModerationReview {
    pub fn passed(&self) -> bool {
        self.outcome == ModerationOutcome::AutoPassed
    }
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    status: String,
    #[serde(default)]
    scores: HashMap<String, f64>,
}

/// Moderate a text value.
pub async fn check_text(config: &ModerationConfig, text: &str) -> ModerationReview {
    check(config, ("text", text)).await
}

/// Moderate an image by URL.
pub async fn check_image_url(config: &ModerationConfig, url: &str) -> ModerationReview {
    check(config, ("url", url)).await
}

async fn check(config: &ModerationConfig, content: (&str, &str)) -> ModerationReview {
    let Some((api_user, api_secret)) = config.credentials() else {
        tracing::warn!("moderation credentials not configured, failing safe to flagged");
        return flagged_fallback();
    };

    let response = reqwest::Client::new()
        .post(format!("{}/check", config.endpoint))
        .form(&[
            ("api_user", api_user),
            ("api_secret", api_secret),
            ("models", config.models.as_str()),
            content,
        ])
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "moderation provider unreachable, failing safe to flagged");
            return flagged_fallback();
        }
    };

    if !response.status().is_success() {
        tracing::warn!(
            status = %response.status(),
            "moderation provider returned non-success status, failing safe to flagged"
        );
        return flagged_fallback();
    }

    match response.json::<ProviderResponse>().await {
        Ok(provider) => review_from_response(provider),
        Err(err) => {
            tracing::warn!(error = %err, "moderation provider response unparseable, failing safe to flagged");
            flagged_fallback()
        }
    }
}

fn review_from_response(provider: ProviderResponse) -> ModerationReview {
    if provider.status != "success" {
        tracing::warn!(
            provider_status = %provider.status,
            "moderation provider reported failure, failing safe to flagged"
        );
        return flagged_fallback();
    }

    let scores: Vec<(String, f64)> = provider.scores.into_iter().collect();
    review_from_scores(&scores)
}

/// Classify provider category scores into a review.
fn review_from_scores(scores: &[(String, f64)]) -> ModerationReview {
    let clean = clean_score(scores);
    let outcome = classify(clean);
    let reasons = match outcome {
        ModerationOutcome::AutoPassed => Vec::new(),
        _ => flagged_categories(scores)
            .into_iter()
            .map(|category| format!("{category} risk detected"))
            .collect(),
    };

    ModerationReview {
        outcome,
        clean_score: Some(clean),
        reasons,
    }
}

fn flagged_fallback() -> ModerationReview {
    ModerationReview {
        outcome: ModerationOutcome::AutoFlagged,
        clean_score: None,
        reasons: vec![SERVICE_UNAVAILABLE_REASON.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(c, s)| (c.to_string(), *s)).collect()
    }

    #[test]
    fn clean_content_passes_with_no_reasons() {
        let review = review_from_scores(&scores(&[("nudity", 0.02), ("weapon", 0.01)]));
        assert_eq!(review.outcome, ModerationOutcome::AutoPassed);
        assert!(review.reasons.is_empty());
        assert!(review.clean_score.unwrap() > 0.9);
    }

    #[test]
    fn borderline_content_is_flagged_with_reasons() {
        let review = review_from_scores(&scores(&[("offensive", 0.3)]));
        assert_eq!(review.outcome, ModerationOutcome::AutoFlagged);
        assert_eq!(review.reasons, vec!["offensive risk detected"]);
    }

    #[test]
    fn high_risk_content_is_blocked() {
        let review = review_from_scores(&scores(&[("nudity", 0.5)]));
        assert_eq!(review.outcome, ModerationOutcome::AutoBlocked);
        assert_eq!(review.clean_score, Some(0.5));
        assert_eq!(review.reasons, vec!["nudity risk detected"]);
    }

    #[test]
    fn provider_failure_status_degrades_to_flagged() {
        let provider = ProviderResponse {
            status: "failure".to_string(),
            scores: HashMap::new(),
        };
        let review = review_from_response(provider);
        assert_eq!(review.outcome, ModerationOutcome::AutoFlagged);
        assert_eq!(review.clean_score, None);
        assert_eq!(review.reasons, vec![SERVICE_UNAVAILABLE_REASON]);
    }

    #[test]
    fn fallback_never_passes() {
        let review = flagged_fallback();
        assert!(!review.passed());
        assert_eq!(review.outcome, ModerationOutcome::AutoFlagged);
    }
}
