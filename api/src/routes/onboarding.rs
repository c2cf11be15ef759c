use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use mm_core::onboarding::{
    self, ESTIMATED_REVIEW_TIME_HOURS, compute_stage, submission_blockers,
};
use mm_core::profiles::{AdminStatus, OnboardingStage, ProfileCounts};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::facts::{load_profile_facts, persist_stage};
use crate::state::AppState;

pub fn status_router() -> Router<AppState> {
    Router::new().route("/v1/onboarding/status", get(onboarding_status))
}

pub fn submit_router() -> Router<AppState> {
    Router::new().route("/v1/onboarding/submit", post(submit_for_review))
}

// ──────────────────────────────────────────────
// GET /v1/onboarding/status
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OnboardingStatusResponse {
    pub stage: OnboardingStage,
    /// 0–100
    pub progress: i64,
    pub next_action: String,
    /// Machine-readable codes for every unmet submission requirement
    pub blockers: Vec<String>,
    /// Human-facing counterpart of `blockers`
    pub blocker_messages: Vec<String>,
    pub can_submit: bool,
    pub counts: ProfileCounts,
}

/// Current onboarding position, derived fresh from the underlying facts.
/// The stored stage is a cache and is updated opportunistically here; the
/// computed value is what callers should trust.
#[utoipa::path(
    get,
    path = "/v1/onboarding/status",
    responses(
        (status = 200, description = "Current onboarding status", body = OnboardingStatusResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "User not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "onboarding"
)]
pub async fn onboarding_status(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<OnboardingStatusResponse>, AppError> {
    let facts = load_profile_facts(&state.db, user.user_id).await?;

    let stage = compute_stage(&facts.input);
    let blockers = submission_blockers(&facts.input);

    if let Some(profile_id) = facts.profile_id {
        if facts.stored_stage != Some(stage) {
            persist_stage(&state.db, profile_id, stage).await;
        }
    }

    tracing::debug!(
        user_id = %user.user_id,
        stage = stage.as_str(),
        blockers = blockers.len(),
        "computed onboarding status"
    );

    Ok(Json(OnboardingStatusResponse {
        stage,
        progress: onboarding::progress_percent(stage),
        next_action: onboarding::next_action(stage).to_string(),
        blockers: blockers.iter().map(|b| b.as_str().to_string()).collect(),
        blocker_messages: blockers.iter().map(|b| b.message().to_string()).collect(),
        can_submit: onboarding::can_submit(&facts.input),
        counts: facts.input.counts,
    }))
}

// ──────────────────────────────────────────────
// POST /v1/onboarding/submit
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    pub submitted_at: DateTime<Utc>,
    pub next_stage: OnboardingStage,
    pub estimated_review_time_hours: i64,
}

/// Submit the profile for staff review. Validates every requirement and
/// reports all failures at once rather than the first one.
#[utoipa::path(
    post,
    path = "/v1/onboarding/submit",
    responses(
        (status = 200, description = "Profile queued for review", body = SubmitResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError),
        (status = 409, description = "Already awaiting review", body = mm_core::error::ApiError),
        (status = 422, description = "Submission requirements unmet", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "onboarding"
)]
pub async fn submit_for_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, AppError> {
    let facts = load_profile_facts(&state.db, user.user_id).await?;

    let Some(profile_id) = facts.profile_id else {
        return Err(AppError::NotFound {
            resource: format!("Profile for user {}", user.user_id),
        });
    };

    if facts.input.admin_status == AdminStatus::PendingAdmin {
        return Err(AppError::AlreadySubmitted);
    }
    if !facts.input.account_active {
        return Err(AppError::Forbidden {
            message: "Account is suspended".to_string(),
            docs_hint: Some("Contact support to resolve the suspension.".to_string()),
        });
    }

    let missing = submission_blockers(&facts.input);
    if !missing.is_empty() {
        return Err(AppError::ProfileIncomplete { missing });
    }

    let submitted_at = Utc::now();

    // The status guard in the WHERE clause keeps a concurrent double-submit
    // from re-stamping submitted_at.
    let result = sqlx::query(
        "UPDATE profiles \
         SET admin_status = 'pending_admin', onboarding_stage = 'waiting_admin', \
             submitted_at = $2, updated_at = NOW() \
         WHERE id = $1 AND admin_status <> 'pending_admin'",
    )
    .bind(profile_id)
    .bind(submitted_at)
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    if result.rows_affected() == 0 {
        return Err(AppError::AlreadySubmitted);
    }

    tracing::info!(
        user_id = %user.user_id,
        profile_id = %profile_id,
        "profile submitted for review"
    );

    Ok(Json(SubmitResponse {
        submitted_at,
        next_stage: OnboardingStage::WaitingAdmin,
        estimated_review_time_hours: ESTIMATED_REVIEW_TIME_HOURS,
    }))
}
