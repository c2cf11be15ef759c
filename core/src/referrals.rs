/// Discount the invited party always receives on their first month,
/// independent of the referrer's tier.
pub const REFEREE_FIRST_MONTH_DISCOUNT_PERCENT: i64 = 20;

/// One rung of the referral ladder. `TIERS` is ordered by ascending
/// `min_referrals`; the highest satisfied rung wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralTier {
    pub name: &'static str,
    pub min_referrals: i64,
    pub discount_percent: i64,
}

pub const TIERS: &[ReferralTier] = &[
    ReferralTier {
        name: "bronze",
        min_referrals: 1,
        discount_percent: 10,
    },
    ReferralTier {
        name: "silver",
        min_referrals: 3,
        discount_percent: 20,
    },
    ReferralTier {
        name: "gold",
        min_referrals: 5,
        discount_percent: 30,
    },
    ReferralTier {
        name: "platinum",
        min_referrals: 10,
        discount_percent: 50,
    },
];

/// Highest tier whose threshold is at or below the successful-referral
/// count. None below the first rung.
pub fn current_tier(successful_referrals: i64) -> Option<&'static ReferralTier> {
    TIERS
        .iter()
        .rev()
        .find(|tier| successful_referrals >= tier.min_referrals)
}

/// Next rung above the count, if any.
pub fn next_tier(successful_referrals: i64) -> Option<&'static ReferralTier> {
    TIERS
        .iter()
        .find(|tier| successful_referrals < tier.min_referrals)
}

/// Linear discount: `price * percent / 100`, rounded down to whole cents.
pub fn discount_cents(price_cents: i64, discount_percent: i64) -> i64 {
    price_cents * discount_percent / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tier_below_one_referral() {
        assert!(current_tier(0).is_none());
        assert!(current_tier(-3).is_none());
    }

    #[test]
    fn highest_satisfied_tier_wins() {
        assert_eq!(current_tier(1).unwrap().name, "bronze");
        assert_eq!(current_tier(2).unwrap().name, "bronze");
        assert_eq!(current_tier(3).unwrap().name, "silver");
        assert_eq!(current_tier(7).unwrap().name, "gold");
        assert_eq!(current_tier(10).unwrap().name, "platinum");
        assert_eq!(current_tier(500).unwrap().name, "platinum");
    }

    #[test]
    fn next_tier_is_the_first_unmet_rung() {
        assert_eq!(next_tier(0).unwrap().name, "bronze");
        assert_eq!(next_tier(4).unwrap().name, "gold");
        assert!(next_tier(10).is_none());
    }

    #[test]
    fn discount_is_linear_in_price() {
        assert_eq!(discount_cents(10_000, 10), 1_000);
        assert_eq!(discount_cents(20_000, 10), 2_000);
        assert_eq!(discount_cents(4_900, 50), 2_450);
        assert_eq!(discount_cents(0, 50), 0);
    }

    #[test]
    fn tiers_are_ascending() {
        for pair in TIERS.windows(2) {
            assert!(pair[0].min_referrals < pair[1].min_referrals);
            assert!(pair[0].discount_percent < pair[1].discount_percent);
        }
    }
}
