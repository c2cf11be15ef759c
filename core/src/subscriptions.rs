use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::plans::PlanTier;
use crate::profiles::ParseEnumError;

/// Billing lifecycle of a subscription. `canceled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    /// Whether this status satisfies the payment requirement for onboarding.
    /// `past_due` does not — the profile drops back to needs_payment.
    pub fn satisfies_payment(&self) -> bool {
        matches!(self, Self::Trialing | Self::Active)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            other => Err(ParseEnumError {
                field: "subscription_status",
                value: other.to_string(),
            }),
        }
    }
}

/// One subscription record. At most one per user may be trialing or active,
/// enforced by the store.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trialing_and_active_satisfy_payment() {
        assert!(SubscriptionStatus::Trialing.satisfies_payment());
        assert!(SubscriptionStatus::Active.satisfies_payment());
    }

    #[test]
    fn past_due_and_canceled_do_not_satisfy_payment() {
        assert!(!SubscriptionStatus::PastDue.satisfies_payment());
        assert!(!SubscriptionStatus::Canceled.satisfies_payment());
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(
                status.as_str().parse::<SubscriptionStatus>().unwrap(),
                status
            );
        }
    }
}
