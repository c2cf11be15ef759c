use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::moderation::AutoModeration;

/// Raised when a stored enum column carries a value this build doesn't know.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized {field} value '{value}'")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

/// Checkpoint describing how far a therapist has progressed from signup to
/// public listing. Stored on the profile row as a cache; the computed value
/// from `onboarding::compute_stage` is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStage {
    Start,
    NeedsPlan,
    NeedsPayment,
    NeedsIdentity,
    BuildProfile,
    UploadPhotos,
    FixModeration,
    SubmitAdmin,
    WaitingAdmin,
    Live,
    Blocked,
}

impl OnboardingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::NeedsPlan => "needs_plan",
            Self::NeedsPayment => "needs_payment",
            Self::NeedsIdentity => "needs_identity",
            Self::BuildProfile => "build_profile",
            Self::UploadPhotos => "upload_photos",
            Self::FixModeration => "fix_moderation",
            Self::SubmitAdmin => "submit_admin",
            Self::WaitingAdmin => "waiting_admin",
            Self::Live => "live",
            Self::Blocked => "blocked",
        }
    }
}

impl FromStr for OnboardingStage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "needs_plan" => Ok(Self::NeedsPlan),
            "needs_payment" => Ok(Self::NeedsPayment),
            "needs_identity" => Ok(Self::NeedsIdentity),
            "build_profile" => Ok(Self::BuildProfile),
            "upload_photos" => Ok(Self::UploadPhotos),
            "fix_moderation" => Ok(Self::FixModeration),
            "submit_admin" => Ok(Self::SubmitAdmin),
            "waiting_admin" => Ok(Self::WaitingAdmin),
            "live" => Ok(Self::Live),
            "blocked" => Ok(Self::Blocked),
            other => Err(ParseEnumError {
                field: "onboarding_stage",
                value: other.to_string(),
            }),
        }
    }
}

/// Review state of a profile as determined by human staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    Draft,
    PendingAdmin,
    Approved,
    Rejected,
    ChangesRequested,
}

impl AdminStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingAdmin => "pending_admin",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ChangesRequested => "changes_requested",
        }
    }
}

impl FromStr for AdminStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_admin" => Ok(Self::PendingAdmin),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "changes_requested" => Ok(Self::ChangesRequested),
            other => Err(ParseEnumError {
                field: "admin_status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    Private,
    Public,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl FromStr for PublicationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(ParseEnumError {
                field: "publication_status",
                value: other.to_string(),
            }),
        }
    }
}

/// A profile may only be published once staff approved it and automated
/// moderation has not blocked required content.
pub fn can_publish(admin_status: AdminStatus, auto_moderation: AutoModeration) -> bool {
    admin_status == AdminStatus::Approved && auto_moderation != AutoModeration::AutoBlocked
}

/// Aggregate content counts for a profile, read fresh before every
/// stage/submission evaluation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileCounts {
    pub approved_photos: i64,
    pub languages: i64,
    pub services: i64,
    pub setups: i64,
    pub incall_rates: i64,
    pub outcall_rates: i64,
}

impl ProfileCounts {
    /// At least one active rate in at least one context.
    pub fn has_rates(&self) -> bool {
        self.incall_rates + self.outcall_rates > 0
    }

    /// Structural profile content beyond media: languages, services, rates.
    pub fn has_structural_content(&self) -> bool {
        self.languages > 0 && self.services > 0 && self.has_rates()
    }
}

/// API-facing representation of a therapist profile.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub headline: Option<String>,
    pub about: Option<String>,
    pub services_description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub slug: Option<String>,
    pub photo_url: Option<String>,
    pub onboarding_stage: OnboardingStage,
    pub admin_status: AdminStatus,
    pub publication_status: PublicationStatus,
    pub auto_moderation: AutoModeration,
    pub available_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_roundtrips_through_strings() {
        for stage in [
            OnboardingStage::Start,
            OnboardingStage::NeedsPlan,
            OnboardingStage::FixModeration,
            OnboardingStage::Live,
            OnboardingStage::Blocked,
        ] {
            assert_eq!(stage.as_str().parse::<OnboardingStage>().unwrap(), stage);
        }
    }

    #[test]
    fn unknown_stage_value_is_rejected() {
        let err = "published".parse::<OnboardingStage>().unwrap_err();
        assert_eq!(err.field, "onboarding_stage");
    }

    #[test]
    fn publication_requires_approval_and_clean_moderation() {
        assert!(can_publish(AdminStatus::Approved, AutoModeration::AutoPassed));
        assert!(can_publish(AdminStatus::Approved, AutoModeration::AutoFlagged));
        assert!(!can_publish(AdminStatus::Approved, AutoModeration::AutoBlocked));
        assert!(!can_publish(AdminStatus::PendingAdmin, AutoModeration::AutoPassed));
        assert!(!can_publish(AdminStatus::Rejected, AutoModeration::AutoPassed));
    }

    #[test]
    fn rates_count_across_both_contexts() {
        let counts = ProfileCounts {
            incall_rates: 0,
            outcall_rates: 2,
            ..Default::default()
        };
        assert!(counts.has_rates());

        let none = ProfileCounts::default();
        assert!(!none.has_rates());
    }
}
