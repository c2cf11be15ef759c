use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use mm_core::plans::PlanTier;
use mm_core::referrals::{
    self, REFEREE_FIRST_MONTH_DISCOUNT_PERCENT, current_tier, next_tier,
};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::facts::load_profile_facts;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/referrals/summary", get(referral_summary))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TierPayload {
    pub name: String,
    pub min_referrals: i64,
    pub discount_percent: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReferralSummaryResponse {
    pub successful_referrals: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<TierPayload>,
    /// Discount off the caller's current plan price, in cents
    pub discount_cents: i64,
    /// What anyone they invite gets on their first month
    pub referee_discount_percent: i64,
}

/// Referral standing: completed referral count, the tier it earns, and the
/// discount that tier takes off the caller's plan price. The tier is always
/// computed from the live counter, never stored.
#[utoipa::path(
    get,
    path = "/v1/referrals/summary",
    responses(
        (status = 200, description = "Referral standing", body = ReferralSummaryResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "referrals"
)]
pub async fn referral_summary(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<ReferralSummaryResponse>, AppError> {
    let successful: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM referrals WHERE referrer_user_id = $1 AND status = 'completed'",
    )
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(AppError::Database)?;

    let facts = load_profile_facts(&state.db, user.user_id).await?;
    let plan = facts.plan.unwrap_or(PlanTier::Free);

    let tier = current_tier(successful);
    let discount_cents = tier
        .map(|t| referrals::discount_cents(plan.price_cents(), t.discount_percent))
        .unwrap_or(0);

    Ok(Json(ReferralSummaryResponse {
        successful_referrals: successful,
        tier: tier.map(tier_payload),
        next_tier: next_tier(successful).map(tier_payload),
        discount_cents,
        referee_discount_percent: REFEREE_FIRST_MONTH_DISCOUNT_PERCENT,
    }))
}

fn tier_payload(tier: &referrals::ReferralTier) -> TierPayload {
    TierPayload {
        name: tier.name.to_string(),
        min_referrals: tier.min_referrals,
        discount_percent: tier.discount_percent,
    }
}
