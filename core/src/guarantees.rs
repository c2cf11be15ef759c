use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Discount applied to the next period when a guarantee was measured and
/// missed.
pub const NOT_MET_DISCOUNT_PERCENT: i64 = 50;

/// Progress of a plan's view guarantee over one measurement window.
/// Eligibility is only ever decided at or after the window's end — a
/// hopeless trajectory mid-window grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GuaranteeProgress {
    pub target_views: i64,
    pub current_views: i64,
    /// 0–100, capped.
    pub percent: i64,
    /// Linear end-of-period projection from the daily rate observed so far.
    pub projected_views: i64,
    pub period_ended: bool,
    pub discount_eligible: bool,
}

impl GuaranteeProgress {
    pub fn evaluate(
        target_views: i64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        current_views: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let target = target_views.max(1);
        let views = current_views.max(0);
        let percent = (views * 100 / target).min(100);

        let total_secs = (period_end - period_start).num_seconds().max(1);
        let elapsed_secs = (now - period_start).num_seconds().clamp(0, total_secs);

        let projected_views = if elapsed_secs == 0 {
            views
        } else {
            let rate = views as f64 / elapsed_secs as f64;
            (rate * total_secs as f64).round() as i64
        };

        let period_ended = now >= period_end;
        let discount_eligible = period_ended && views < target;

        Self {
            target_views: target,
            current_views: views,
            percent,
            projected_views,
            period_ended,
            discount_eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        (start, start + Duration::days(30))
    }

    #[test]
    fn percent_is_capped_at_one_hundred() {
        let (start, end) = window();
        let progress =
            GuaranteeProgress::evaluate(300, start, end, 450, start + Duration::days(10));
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn projection_extrapolates_the_observed_daily_rate() {
        let (start, end) = window();
        // 100 views in 10 of 30 days projects to 300.
        let progress =
            GuaranteeProgress::evaluate(300, start, end, 100, start + Duration::days(10));
        assert_eq!(progress.projected_views, 300);
    }

    #[test]
    fn no_eligibility_before_period_end_even_when_hopeless() {
        let (start, end) = window();
        let progress = GuaranteeProgress::evaluate(300, start, end, 1, end - Duration::hours(1));
        assert!(!progress.period_ended);
        assert!(!progress.discount_eligible);
    }

    #[test]
    fn eligibility_decided_at_period_end() {
        let (start, end) = window();

        let missed = GuaranteeProgress::evaluate(300, start, end, 120, end);
        assert!(missed.period_ended);
        assert!(missed.discount_eligible);

        let met = GuaranteeProgress::evaluate(300, start, end, 300, end);
        assert!(met.period_ended);
        assert!(!met.discount_eligible);
    }

    #[test]
    fn views_before_window_start_do_not_panic() {
        let (start, end) = window();
        let progress = GuaranteeProgress::evaluate(300, start, end, 0, start);
        assert_eq!(progress.projected_views, 0);
        assert_eq!(progress.percent, 0);
    }
}
