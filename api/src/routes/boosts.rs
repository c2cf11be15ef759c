use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use mm_core::plans::{self, PlanTier};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::facts::load_profile_facts;
use crate::routes::profiles::load_own_profile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/profiles/me/boost", post(use_boost))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BoostResponse {
    pub applied: bool,
    pub limit: i64,
    pub remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_message: Option<String>,
}

/// Spend one highlight credit to boost the profile in search results.
/// Credits replenish monthly; usage is counted fresh on every attempt.
#[utoipa::path(
    post,
    path = "/v1/profiles/me/boost",
    responses(
        (status = 200, description = "Boost outcome", body = BoostResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "boosts"
)]
pub async fn use_boost(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<BoostResponse>, AppError> {
    let profile = load_own_profile(&state.db, user.user_id).await?;
    let facts = load_profile_facts(&state.db, user.user_id).await?;
    let plan = facts.plan.unwrap_or(PlanTier::Free);

    let used_this_month: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM profile_boosts \
         WHERE profile_id = $1 AND created_at >= date_trunc('month', NOW())",
    )
    .bind(profile.id)
    .fetch_one(&state.db)
    .await
    .map_err(AppError::Database)?;

    let entitlement = plans::can_use_highlight(plan, used_this_month);
    if !entitlement.allowed {
        tracing::info!(
            profile_id = %profile.id,
            plan = plan.as_str(),
            used_this_month,
            "highlight credits exhausted"
        );
        return Ok(Json(BoostResponse {
            applied: false,
            limit: entitlement.limit,
            remaining: 0,
            upgrade_message: plans::upgrade_message(plan).map(str::to_string),
        }));
    }

    sqlx::query("INSERT INTO profile_boosts (id, profile_id) VALUES ($1, $2)")
        .bind(Uuid::now_v7())
        .bind(profile.id)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;

    let after = plans::can_use_highlight(plan, used_this_month + 1);
    Ok(Json(BoostResponse {
        applied: true,
        limit: after.limit,
        remaining: after.remaining,
        upgrade_message: None,
    }))
}
