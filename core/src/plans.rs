use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::profiles::ParseEnumError;

/// Wire encoding for "unlimited" in entitlement payloads.
pub const UNLIMITED: i64 = -1;

/// Subscription level gating feature limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Standard,
    Pro,
    Elite,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Standard => "standard",
            Self::Pro => "pro",
            Self::Elite => "elite",
        }
    }

    /// Monthly price in cents. Free is zero.
    pub fn price_cents(&self) -> i64 {
        match self {
            Self::Free => 0,
            Self::Standard => 4_900,
            Self::Pro => 9_900,
            Self::Elite => 19_900,
        }
    }

    /// Guaranteed profile views per period, if the plan carries a guarantee.
    pub fn guaranteed_views(&self) -> Option<i64> {
        match self {
            Self::Free => None,
            Self::Standard => Some(300),
            Self::Pro => Some(800),
            Self::Elite => Some(2_000),
        }
    }

    pub fn limits(&self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                gallery_photos: Some(2),
                videos: Some(0),
                available_now_per_day: Some(1),
                visitor_cities: Some(0),
                highlight_credits: Some(0),
            },
            Self::Standard => PlanLimits {
                gallery_photos: Some(6),
                videos: Some(1),
                available_now_per_day: Some(3),
                visitor_cities: Some(1),
                highlight_credits: Some(1),
            },
            Self::Pro => PlanLimits {
                gallery_photos: Some(12),
                videos: Some(3),
                available_now_per_day: Some(8),
                visitor_cities: Some(3),
                highlight_credits: Some(4),
            },
            Self::Elite => PlanLimits {
                gallery_photos: None,
                videos: None,
                available_now_per_day: None,
                visitor_cities: Some(10),
                highlight_credits: Some(10),
            },
        }
    }
}

impl FromStr for PlanTier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "standard" => Ok(Self::Standard),
            "pro" => Ok(Self::Pro),
            "elite" => Ok(Self::Elite),
            other => Err(ParseEnumError {
                field: "plan",
                value: other.to_string(),
            }),
        }
    }
}

/// Feature limits for a plan tier. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub gallery_photos: Option<i64>,
    pub videos: Option<i64>,
    pub available_now_per_day: Option<i64>,
    pub visitor_cities: Option<i64>,
    pub highlight_credits: Option<i64>,
}

/// What kind of media an upload is. The profile photo slot is singular on
/// every tier; galleries and videos scale with the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Profile,
    Gallery,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Gallery => "gallery",
            Self::Video => "video",
        }
    }
}

impl FromStr for MediaKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "gallery" => Ok(Self::Gallery),
            "video" => Ok(Self::Video),
            other => Err(ParseEnumError {
                field: "media_kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Result of a single entitlement check. `limit`/`remaining` use `-1` for
/// unlimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Entitlement {
    pub allowed: bool,
    pub limit: i64,
    pub remaining: i64,
}

impl Entitlement {
    fn evaluate(limit: Option<i64>, current: i64) -> Self {
        match limit {
            None => Self {
                allowed: true,
                limit: UNLIMITED,
                remaining: UNLIMITED,
            },
            Some(limit) => {
                let remaining = (limit - current).max(0);
                Self {
                    allowed: current < limit,
                    limit,
                    remaining,
                }
            }
        }
    }
}

/// Whether one more media asset of `kind` may be added. Counters must be
/// re-read immediately before every call; results are never cached.
pub fn can_upload_photo(plan: PlanTier, kind: MediaKind, current_count: i64) -> Entitlement {
    let limits = plan.limits();
    match kind {
        MediaKind::Profile => Entitlement::evaluate(Some(1), current_count),
        MediaKind::Gallery => Entitlement::evaluate(limits.gallery_photos, current_count),
        MediaKind::Video => Entitlement::evaluate(limits.videos, current_count),
    }
}

/// Whether the daily "available now" toggle may be used again today.
pub fn can_use_available_now(plan: PlanTier, used_today: i64) -> Entitlement {
    Entitlement::evaluate(plan.limits().available_now_per_day, used_today)
}

/// Whether another visitor-city slot may be occupied.
pub fn can_add_visitor_city(plan: PlanTier, current: i64) -> Entitlement {
    Entitlement::evaluate(plan.limits().visitor_cities, current)
}

/// Whether another highlight boost may be spent this period.
pub fn can_use_highlight(plan: PlanTier, used: i64) -> Entitlement {
    Entitlement::evaluate(plan.limits().highlight_credits, used)
}

/// Static upsell copy for the next tier up. Elite has nowhere to go.
pub fn upgrade_message(plan: PlanTier) -> Option<&'static str> {
    match plan {
        PlanTier::Free => {
            Some("Upgrade to Standard for more gallery photos, video, and daily availability.")
        }
        PlanTier::Standard => {
            Some("Upgrade to Pro for a bigger gallery, more videos, and extra visitor cities.")
        }
        PlanTier::Pro => Some("Upgrade to Elite for unlimited media and maximum visibility."),
        PlanTier::Elite => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_uploads_stop_exactly_at_the_limit() {
        for plan in [PlanTier::Free, PlanTier::Standard, PlanTier::Pro] {
            let limit = plan.limits().gallery_photos.unwrap();
            for n in 0..limit {
                assert!(
                    can_upload_photo(plan, MediaKind::Gallery, n).allowed,
                    "{plan:?} should allow photo {n} of {limit}"
                );
            }
            for n in limit..limit + 3 {
                assert!(
                    !can_upload_photo(plan, MediaKind::Gallery, n).allowed,
                    "{plan:?} should reject photo {n} of {limit}"
                );
            }
        }
    }

    #[test]
    fn unlimited_gallery_always_allows() {
        for n in [0, 50, 10_000] {
            let ent = can_upload_photo(PlanTier::Elite, MediaKind::Gallery, n);
            assert!(ent.allowed);
            assert_eq!(ent.limit, UNLIMITED);
            assert_eq!(ent.remaining, UNLIMITED);
        }
    }

    #[test]
    fn profile_photo_slot_is_singular_on_every_tier() {
        for plan in [
            PlanTier::Free,
            PlanTier::Standard,
            PlanTier::Pro,
            PlanTier::Elite,
        ] {
            assert!(can_upload_photo(plan, MediaKind::Profile, 0).allowed);
            assert!(!can_upload_photo(plan, MediaKind::Profile, 1).allowed);
        }
    }

    #[test]
    fn free_plan_has_no_video_slot() {
        let ent = can_upload_photo(PlanTier::Free, MediaKind::Video, 0);
        assert!(!ent.allowed);
        assert_eq!(ent.remaining, 0);
    }

    #[test]
    fn remaining_counts_down_and_floors_at_zero() {
        let ent = can_use_available_now(PlanTier::Standard, 1);
        assert_eq!(ent.remaining, 2);

        let over = can_use_available_now(PlanTier::Standard, 9);
        assert!(!over.allowed);
        assert_eq!(over.remaining, 0);
    }

    #[test]
    fn free_plan_gets_no_visitor_cities() {
        assert!(!can_add_visitor_city(PlanTier::Free, 0).allowed);
        assert!(can_add_visitor_city(PlanTier::Standard, 0).allowed);
    }

    #[test]
    fn every_tier_below_elite_has_an_upgrade_message() {
        assert!(upgrade_message(PlanTier::Free).is_some());
        assert!(upgrade_message(PlanTier::Standard).is_some());
        assert!(upgrade_message(PlanTier::Pro).is_some());
        assert!(upgrade_message(PlanTier::Elite).is_none());
    }
}
