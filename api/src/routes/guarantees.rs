use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use mm_core::guarantees::{GuaranteeProgress, NOT_MET_DISCOUNT_PERCENT};
use mm_core::plans::PlanTier;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::facts::load_profile_facts;
use crate::state::AppState;

const PERIOD_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/guarantees/current", get(current_guarantee))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GuaranteeResponse {
    pub plan: PlanTier,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(flatten)]
    pub progress: GuaranteeProgress,
    /// Discount applied to the next period when the guarantee was missed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct PeriodRow {
    id: Uuid,
    target_views: i64,
    view_count: i64,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    discount_earned: bool,
}

/// Progress against the plan's view guarantee for the current measurement
/// window. Eligibility for the not-met discount is only ever decided once
/// the window has actually ended.
#[utoipa::path(
    get,
    path = "/v1/guarantees/current",
    responses(
        (status = 200, description = "Guarantee progress", body = GuaranteeResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Plan carries no view guarantee", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "guarantees"
)]
pub async fn current_guarantee(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<GuaranteeResponse>, AppError> {
    let facts = load_profile_facts(&state.db, user.user_id).await?;
    let plan = facts.plan.unwrap_or(PlanTier::Free);

    let Some(target) = plan.guaranteed_views() else {
        return Err(AppError::NotFound {
            resource: format!("View guarantee for the {} plan", plan.as_str()),
        });
    };

    let existing = sqlx::query_as::<_, PeriodRow>(
        "SELECT id, target_views, view_count, period_start, period_end, discount_earned \
         FROM guarantee_periods WHERE user_id = $1 \
         ORDER BY period_end DESC LIMIT 1",
    )
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Database)?;

    let row = match existing {
        Some(row) => row,
        None => open_period(&state.db, user.user_id, target).await?,
    };

    let now = Utc::now();
    let progress = GuaranteeProgress::evaluate(
        row.target_views,
        row.period_start,
        row.period_end,
        row.view_count,
        now,
    );

    // Record the earned discount once, the first time the ended period is
    // observed short of its target.
    if progress.discount_eligible && !row.discount_earned {
        sqlx::query("UPDATE guarantee_periods SET discount_earned = TRUE WHERE id = $1")
            .bind(row.id)
            .execute(&state.db)
            .await
            .map_err(AppError::Database)?;

        tracing::info!(
            user_id = %user.user_id,
            period_id = %row.id,
            views = row.view_count,
            target = row.target_views,
            "view guarantee missed, discount earned"
        );
    }

    Ok(Json(GuaranteeResponse {
        plan,
        period_start: row.period_start,
        period_end: row.period_end,
        progress,
        discount_percent: progress
            .discount_eligible
            .then_some(NOT_MET_DISCOUNT_PERCENT),
    }))
}

async fn open_period(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    target_views: i64,
) -> Result<PeriodRow, AppError> {
    let id = Uuid::now_v7();
    let period_start = Utc::now();
    let period_end = period_start + Duration::days(PERIOD_DAYS);

    sqlx::query(
        "INSERT INTO guarantee_periods \
             (id, user_id, target_views, view_count, period_start, period_end) \
         VALUES ($1, $2, $3, 0, $4, $5)",
    )
    .bind(id)
    .bind(user_id)
    .bind(target_views)
    .bind(period_start)
    .bind(period_end)
    .execute(pool)
    .await
    .map_err(AppError::Database)?;

    Ok(PeriodRow {
        id,
        target_views,
        view_count: 0,
        period_start,
        period_end,
        discount_earned: false,
    })
}
