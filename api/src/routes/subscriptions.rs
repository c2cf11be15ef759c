use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use mm_core::plans::PlanTier;
use mm_core::subscriptions::{Subscription, SubscriptionStatus};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

const TRIAL_DAYS: i64 = 7;

pub fn write_router() -> Router<AppState> {
    Router::new().route("/v1/subscriptions", post(select_plan))
}

pub fn read_router() -> Router<AppState> {
    Router::new().route("/v1/subscriptions/current", get(current_subscription))
}

// ──────────────────────────────────────────────
// POST /v1/subscriptions
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SelectPlanRequest {
    pub plan: PlanTier,
}

/// Start a subscription on the chosen plan. "One trialing/active
/// subscription per user" is a partial unique index in the store, not an
/// application-level read-then-check — a lost race surfaces as the same
/// conflict as a plain duplicate.
#[utoipa::path(
    post,
    path = "/v1/subscriptions",
    request_body = SelectPlanRequest,
    responses(
        (status = 201, description = "Subscription created", body = Subscription),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 409, description = "Active subscription exists", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "subscriptions"
)]
pub async fn select_plan(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<SelectPlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = Uuid::now_v7();
    let trial_ends_at = Utc::now() + Duration::days(TRIAL_DAYS);

    let result = sqlx::query(
        "INSERT INTO subscriptions (id, user_id, plan, status, trial_ends_at) \
         VALUES ($1, $2, $3, 'trialing', $4) \
         ON CONFLICT (user_id) WHERE status IN ('trialing', 'active') DO NOTHING",
    )
    .bind(id)
    .bind(user.user_id)
    .bind(req.plan.as_str())
    .bind(trial_ends_at)
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    if result.rows_affected() == 0 {
        return Err(AppError::DuplicateSubscription);
    }

    tracing::info!(
        user_id = %user.user_id,
        plan = req.plan.as_str(),
        "subscription trial started"
    );

    Ok((
        StatusCode::CREATED,
        Json(Subscription {
            id,
            user_id: user.user_id,
            plan: req.plan,
            status: SubscriptionStatus::Trialing,
            provider_subscription_id: None,
            trial_ends_at: Some(trial_ends_at),
            current_period_start: None,
            current_period_end: None,
        }),
    ))
}

// ──────────────────────────────────────────────
// GET /v1/subscriptions/current
// ──────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan: String,
    status: String,
    provider_subscription_id: Option<String>,
    trial_ends_at: Option<DateTime<Utc>>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/v1/subscriptions/current",
    responses(
        (status = 200, description = "The caller's current subscription", body = Subscription),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "No current subscription", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "subscriptions"
)]
pub async fn current_subscription(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Subscription>, AppError> {
    let row = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT id, user_id, plan, status, provider_subscription_id, trial_ends_at, \
                current_period_start, current_period_end \
         FROM subscriptions \
         WHERE user_id = $1 AND status IN ('trialing', 'active', 'past_due') \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Database)?
    .ok_or_else(|| AppError::NotFound {
        resource: format!("Subscription for user {}", user.user_id),
    })?;

    Ok(Json(Subscription {
        id: row.id,
        user_id: row.user_id,
        plan: row.plan.parse::<PlanTier>()?,
        status: row.status.parse::<SubscriptionStatus>()?,
        provider_subscription_id: row.provider_subscription_id,
        trial_ends_at: row.trial_ends_at,
        current_period_start: row.current_period_start,
        current_period_end: row.current_period_end,
    }))
}
