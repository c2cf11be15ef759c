use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::moderation::AutoModeration;
use crate::profiles::{AdminStatus, OnboardingStage, ProfileCounts, can_publish};
use crate::subscriptions::SubscriptionStatus;

pub const ESTIMATED_REVIEW_TIME_HOURS: i64 = 24;

/// The facts a stage evaluation runs over, read fresh from the store just
/// before every call.
#[derive(Debug, Clone, Copy)]
pub struct StageInput {
    pub profile_exists: bool,
    /// False when staff suspended the account. Only staff can lift it.
    pub account_active: bool,
    pub identity_verified: bool,
    pub subscription: Option<SubscriptionStatus>,
    pub admin_status: AdminStatus,
    pub auto_moderation: AutoModeration,
    pub counts: ProfileCounts,
}

/// One unmet submission requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    Subscription,
    Payment,
    Identity,
    Languages,
    Services,
    Photos,
    Rates,
    Moderation,
}

impl Blocker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Payment => "payment",
            Self::Identity => "identity",
            Self::Languages => "languages",
            Self::Services => "services",
            Self::Photos => "photos",
            Self::Rates => "rates",
            Self::Moderation => "moderation",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Subscription => "Choose a plan to continue",
            Self::Payment => "Your subscription payment needs attention",
            Self::Identity => "Verify your identity",
            Self::Languages => "Add at least one language",
            Self::Services => "Add at least one service",
            Self::Photos => "Upload at least one approved photo",
            Self::Rates => "Add at least one active rate",
            Self::Moderation => "Resolve flagged content before submitting",
        }
    }
}

/// Derive the onboarding stage from the underlying facts. The stored
/// `onboarding_stage` column is a cache of this result, persisted
/// opportunistically; a stale stored value never wins over this derivation.
pub fn compute_stage(input: &StageInput) -> OnboardingStage {
    if !input.account_active {
        return OnboardingStage::Blocked;
    }
    if !input.profile_exists {
        return OnboardingStage::Start;
    }
    let Some(subscription) = input.subscription else {
        return OnboardingStage::NeedsPlan;
    };
    // past_due and canceled both drop the profile back here, even if it was
    // previously live.
    if !subscription.satisfies_payment() {
        return OnboardingStage::NeedsPayment;
    }
    if !input.identity_verified {
        return OnboardingStage::NeedsIdentity;
    }
    if input.admin_status == AdminStatus::PendingAdmin {
        return OnboardingStage::WaitingAdmin;
    }
    if can_publish(input.admin_status, input.auto_moderation) {
        return OnboardingStage::Live;
    }
    if !input.counts.has_structural_content() {
        return OnboardingStage::BuildProfile;
    }
    if input.counts.approved_photos == 0 {
        return OnboardingStage::UploadPhotos;
    }
    if input.auto_moderation == AutoModeration::AutoBlocked {
        return OnboardingStage::FixModeration;
    }
    OnboardingStage::SubmitAdmin
}

/// Every unmet submission requirement, in a stable order. Never early-exits:
/// a profile missing photos and rates reports both.
pub fn submission_blockers(input: &StageInput) -> Vec<Blocker> {
    let mut blockers = Vec::new();

    match input.subscription {
        None => blockers.push(Blocker::Subscription),
        Some(status) if !status.satisfies_payment() => blockers.push(Blocker::Payment),
        Some(_) => {}
    }
    if !input.identity_verified {
        blockers.push(Blocker::Identity);
    }
    if input.counts.languages == 0 {
        blockers.push(Blocker::Languages);
    }
    if input.counts.services == 0 {
        blockers.push(Blocker::Services);
    }
    if input.counts.approved_photos == 0 {
        blockers.push(Blocker::Photos);
    }
    if !input.counts.has_rates() {
        blockers.push(Blocker::Rates);
    }
    if input.auto_moderation == AutoModeration::AutoBlocked {
        blockers.push(Blocker::Moderation);
    }

    blockers
}

/// Whether the profile may be submitted for review right now.
pub fn can_submit(input: &StageInput) -> bool {
    input.account_active
        && input.profile_exists
        && input.admin_status != AdminStatus::PendingAdmin
        && submission_blockers(input).is_empty()
}

/// Coarse progress indicator for the status payload.
pub fn progress_percent(stage: OnboardingStage) -> i64 {
    match stage {
        OnboardingStage::Start => 0,
        OnboardingStage::NeedsPlan => 10,
        OnboardingStage::NeedsPayment => 20,
        OnboardingStage::NeedsIdentity => 30,
        OnboardingStage::BuildProfile => 45,
        OnboardingStage::UploadPhotos => 60,
        OnboardingStage::FixModeration => 70,
        OnboardingStage::SubmitAdmin => 85,
        OnboardingStage::WaitingAdmin => 95,
        OnboardingStage::Live => 100,
        OnboardingStage::Blocked => 0,
    }
}

/// Machine-readable next step for the caller's UI.
pub fn next_action(stage: OnboardingStage) -> &'static str {
    match stage {
        OnboardingStage::Start => "create_profile",
        OnboardingStage::NeedsPlan => "choose_plan",
        OnboardingStage::NeedsPayment => "complete_payment",
        OnboardingStage::NeedsIdentity => "verify_identity",
        OnboardingStage::BuildProfile => "complete_profile",
        OnboardingStage::UploadPhotos => "upload_photo",
        OnboardingStage::FixModeration => "resolve_moderation",
        OnboardingStage::SubmitAdmin => "submit_for_review",
        OnboardingStage::WaitingAdmin => "await_review",
        OnboardingStage::Live => "none",
        OnboardingStage::Blocked => "contact_support",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> StageInput {
        StageInput {
            profile_exists: true,
            account_active: true,
            identity_verified: true,
            subscription: Some(SubscriptionStatus::Active),
            admin_status: AdminStatus::Draft,
            auto_moderation: AutoModeration::AutoPassed,
            counts: ProfileCounts {
                approved_photos: 3,
                languages: 2,
                services: 4,
                setups: 1,
                incall_rates: 2,
                outcall_rates: 0,
            },
        }
    }

    #[test]
    fn new_user_lands_on_needs_plan_with_full_blocker_list() {
        let input = StageInput {
            subscription: None,
            identity_verified: false,
            counts: ProfileCounts::default(),
            ..complete_input()
        };

        assert_eq!(compute_stage(&input), OnboardingStage::NeedsPlan);
        assert!(!can_submit(&input));

        let blockers = submission_blockers(&input);
        assert!(blockers.contains(&Blocker::Subscription));
        assert!(blockers.contains(&Blocker::Photos));
        assert!(blockers.contains(&Blocker::Rates));
        assert!(blockers.contains(&Blocker::Identity));
    }

    #[test]
    fn blockers_accumulate_instead_of_early_exiting() {
        let input = StageInput {
            counts: ProfileCounts {
                approved_photos: 0,
                incall_rates: 0,
                outcall_rates: 0,
                ..complete_input().counts
            },
            ..complete_input()
        };

        let blockers = submission_blockers(&input);
        assert_eq!(blockers, vec![Blocker::Photos, Blocker::Rates]);
    }

    #[test]
    fn complete_profile_reaches_submit_admin() {
        let input = complete_input();
        assert_eq!(compute_stage(&input), OnboardingStage::SubmitAdmin);
        assert!(can_submit(&input));
        assert!(submission_blockers(&input).is_empty());
    }

    #[test]
    fn past_due_subscription_resolves_to_needs_payment() {
        let input = StageInput {
            subscription: Some(SubscriptionStatus::PastDue),
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::NeedsPayment);
        assert_eq!(submission_blockers(&input), vec![Blocker::Payment]);
    }

    #[test]
    fn past_due_outranks_an_approved_listing() {
        let input = StageInput {
            subscription: Some(SubscriptionStatus::PastDue),
            admin_status: AdminStatus::Approved,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::NeedsPayment);
    }

    #[test]
    fn zero_media_never_resolves_to_live() {
        let input = StageInput {
            counts: ProfileCounts {
                approved_photos: 0,
                ..complete_input().counts
            },
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::UploadPhotos);
    }

    #[test]
    fn blocked_content_surfaces_after_structure_and_photos() {
        let input = StageInput {
            auto_moderation: AutoModeration::AutoBlocked,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::FixModeration);
        assert_eq!(submission_blockers(&input), vec![Blocker::Moderation]);
    }

    #[test]
    fn pending_admin_waits_and_cannot_resubmit() {
        let input = StageInput {
            admin_status: AdminStatus::PendingAdmin,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::WaitingAdmin);
        assert!(!can_submit(&input));
    }

    #[test]
    fn approved_clean_profile_is_live() {
        let input = StageInput {
            admin_status: AdminStatus::Approved,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::Live);
    }

    #[test]
    fn approved_profile_with_blocked_content_must_fix_moderation() {
        let input = StageInput {
            admin_status: AdminStatus::Approved,
            auto_moderation: AutoModeration::AutoBlocked,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::FixModeration);
    }

    #[test]
    fn suspension_dominates_every_other_state() {
        let input = StageInput {
            account_active: false,
            admin_status: AdminStatus::Approved,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::Blocked);
        assert!(!can_submit(&input));
    }

    #[test]
    fn missing_profile_row_is_start() {
        let input = StageInput {
            profile_exists: false,
            ..complete_input()
        };
        assert_eq!(compute_stage(&input), OnboardingStage::Start);
    }

    #[test]
    fn progress_is_monotone_along_the_happy_path() {
        let path = [
            OnboardingStage::Start,
            OnboardingStage::NeedsPlan,
            OnboardingStage::NeedsPayment,
            OnboardingStage::NeedsIdentity,
            OnboardingStage::BuildProfile,
            OnboardingStage::UploadPhotos,
            OnboardingStage::FixModeration,
            OnboardingStage::SubmitAdmin,
            OnboardingStage::WaitingAdmin,
            OnboardingStage::Live,
        ];
        for pair in path.windows(2) {
            assert!(progress_percent(pair[0]) < progress_percent(pair[1]));
        }
    }
}
