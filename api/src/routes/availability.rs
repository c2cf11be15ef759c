use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mm_core::plans::{self, PlanTier};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::facts::load_profile_facts;
use crate::routes::profiles::load_own_profile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/availability/now", post(toggle_available_now))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AvailableNowRequest {
    pub available: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AvailableNowResponse {
    pub available: bool,
    pub allowed: bool,
    pub limit: i64,
    pub remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_message: Option<String>,
}

/// Toggle the "available now" flag. Turning it on consumes one of the
/// plan's daily toggles, checked against a freshly-read counter; turning it
/// off is always free.
#[utoipa::path(
    post,
    path = "/v1/availability/now",
    request_body = AvailableNowRequest,
    responses(
        (status = 200, description = "Toggle outcome", body = AvailableNowResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "availability"
)]
pub async fn toggle_available_now(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<AvailableNowRequest>,
) -> Result<Json<AvailableNowResponse>, AppError> {
    let profile = load_own_profile(&state.db, user.user_id).await?;
    let facts = load_profile_facts(&state.db, user.user_id).await?;
    let plan = facts.plan.unwrap_or(PlanTier::Free);

    let used_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM availability_toggles \
         WHERE profile_id = $1 AND toggled_date = CURRENT_DATE",
    )
    .bind(profile.id)
    .fetch_one(&state.db)
    .await
    .map_err(AppError::Database)?;

    if !req.available {
        sqlx::query("UPDATE profiles SET available_now = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(profile.id)
            .execute(&state.db)
            .await
            .map_err(AppError::Database)?;

        let entitlement = plans::can_use_available_now(plan, used_today);
        return Ok(Json(AvailableNowResponse {
            available: false,
            allowed: entitlement.allowed,
            limit: entitlement.limit,
            remaining: entitlement.remaining,
            upgrade_message: None,
        }));
    }

    let entitlement = plans::can_use_available_now(plan, used_today);
    if !entitlement.allowed {
        tracing::info!(
            profile_id = %profile.id,
            plan = plan.as_str(),
            used_today,
            "daily available-now quota exhausted"
        );
        return Ok(Json(AvailableNowResponse {
            available: profile.available_now,
            allowed: false,
            limit: entitlement.limit,
            remaining: 0,
            upgrade_message: plans::upgrade_message(plan).map(str::to_string),
        }));
    }

    sqlx::query(
        "INSERT INTO availability_toggles (id, profile_id, toggled_date) \
         VALUES ($1, $2, CURRENT_DATE)",
    )
    .bind(Uuid::now_v7())
    .bind(profile.id)
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    sqlx::query("UPDATE profiles SET available_now = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(profile.id)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;

    let after = plans::can_use_available_now(plan, used_today + 1);
    Ok(Json(AvailableNowResponse {
        available: true,
        allowed: true,
        limit: after.limit,
        remaining: after.remaining,
        upgrade_message: None,
    }))
}
