use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mm_core::moderation::{AutoModeration, is_moderated_text_field};
use mm_core::profiles::{AdminStatus, can_publish};

use crate::auth::{AuthenticatedUser, require_admin};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/review-queue", get(review_queue))
        .route("/v1/admin/profiles/{profile_id}/review", post(review_profile))
        .route("/v1/admin/pending-edits", get(pending_edits))
        .route("/v1/admin/pending-edits/{edit_id}/resolve", post(resolve_pending_edit))
        .route("/v1/admin/users/{user_id}/suspend", post(suspend_user))
        .route("/v1/admin/users/{user_id}/reinstate", post(reinstate_user))
}

// ──────────────────────────────────────────────
// GET /v1/admin/review-queue
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct ReviewQueueItem {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub auto_moderation: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewQueueResponse {
    pub profiles: Vec<ReviewQueueItem>,
}

/// Profiles awaiting review, oldest submission first.
#[utoipa::path(
    get,
    path = "/v1/admin/review-queue",
    responses(
        (status = 200, description = "Profiles awaiting review", body = ReviewQueueResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 403, description = "Not staff", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn review_queue(
    admin: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<ReviewQueueResponse>, AppError> {
    require_admin(&admin, "GET /v1/admin/review-queue")?;

    let profiles = sqlx::query_as::<_, ReviewQueueItem>(
        "SELECT id AS profile_id, user_id, display_name, city, auto_moderation, submitted_at \
         FROM profiles WHERE admin_status = 'pending_admin' \
         ORDER BY submitted_at ASC NULLS LAST",
    )
    .fetch_all(&state.db)
    .await
    .map_err(AppError::Database)?;

    Ok(Json(ReviewQueueResponse { profiles }))
}

// ──────────────────────────────────────────────
// POST /v1/admin/profiles/{profile_id}/review
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestChanges,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewResponse {
    pub profile_id: Uuid,
    pub admin_status: AdminStatus,
    pub published: bool,
}

/// Resolve a pending review. Approval publishes the profile only when the
/// publication invariant holds (no blocking moderation state); otherwise it
/// stays private until the content is fixed.
#[utoipa::path(
    post,
    path = "/v1/admin/profiles/{profile_id}/review",
    params(("profile_id" = Uuid, Path, description = "Profile under review")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = ReviewResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 403, description = "Not staff", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError),
        (status = 409, description = "Profile is not awaiting review", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn review_profile(
    admin: AuthenticatedUser,
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    AppJson(req): AppJson<ReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    require_admin(&admin, "POST /v1/admin/profiles/{id}/review")?;

    let row: Option<(String, String)> = sqlx::query_as(
        "SELECT admin_status, auto_moderation FROM profiles WHERE id = $1",
    )
    .bind(profile_id)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Database)?;

    let Some((admin_status, auto_moderation)) = row else {
        return Err(AppError::NotFound {
            resource: format!("Profile {profile_id}"),
        });
    };

    if admin_status.parse::<AdminStatus>()? != AdminStatus::PendingAdmin {
        return Err(AppError::Validation {
            message: "Profile is not awaiting review".to_string(),
            field: None,
            received: Some(serde_json::Value::String(admin_status)),
            docs_hint: Some("Only profiles in pending_admin can be reviewed.".to_string()),
        });
    }

    let auto_moderation = auto_moderation.parse::<AutoModeration>()?;

    let (new_status, published) = match req.action {
        ReviewAction::Approve => {
            let publish = can_publish(AdminStatus::Approved, auto_moderation);
            sqlx::query(
                "UPDATE profiles \
                 SET admin_status = 'approved', approved_at = NOW(), \
                     publication_status = CASE WHEN $2 THEN 'public' ELSE 'private' END, \
                     onboarding_stage = CASE WHEN $2 THEN 'live' ELSE 'fix_moderation' END, \
                     updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(profile_id)
            .bind(publish)
            .execute(&state.db)
            .await
            .map_err(AppError::Database)?;
            (AdminStatus::Approved, publish)
        }
        ReviewAction::Reject => {
            sqlx::query(
                "UPDATE profiles \
                 SET admin_status = 'rejected', publication_status = 'private', \
                     onboarding_stage = 'submit_admin', updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(profile_id)
            .execute(&state.db)
            .await
            .map_err(AppError::Database)?;
            (AdminStatus::Rejected, false)
        }
        ReviewAction::RequestChanges => {
            sqlx::query(
                "UPDATE profiles \
                 SET admin_status = 'changes_requested', publication_status = 'private', \
                     onboarding_stage = 'build_profile', updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(profile_id)
            .execute(&state.db)
            .await
            .map_err(AppError::Database)?;
            (AdminStatus::ChangesRequested, false)
        }
    };

    tracing::info!(
        admin_user_id = %admin.user_id,
        profile_id = %profile_id,
        action = ?req.action,
        reason = req.reason.as_deref().unwrap_or(""),
        published,
        "profile review decision"
    );

    Ok(Json(ReviewResponse {
        profile_id,
        admin_status: new_status,
        published,
    }))
}

// ──────────────────────────────────────────────
// GET /v1/admin/pending-edits
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct PendingEditItem {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PendingEditsResponse {
    pub edits: Vec<PendingEditItem>,
}

/// Text changes held back by automated moderation, oldest first.
#[utoipa::path(
    get,
    path = "/v1/admin/pending-edits",
    responses(
        (status = 200, description = "Edits awaiting review", body = PendingEditsResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 403, description = "Not staff", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn pending_edits(
    admin: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<PendingEditsResponse>, AppError> {
    require_admin(&admin, "GET /v1/admin/pending-edits")?;

    let edits = sqlx::query_as::<_, PendingEditItem>(
        "SELECT id, profile_id, field_name, old_value, new_value, reasons, created_at \
         FROM pending_edits WHERE status = 'pending_review' \
         ORDER BY created_at ASC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(AppError::Database)?;

    Ok(Json(PendingEditsResponse { edits }))
}

// ──────────────────────────────────────────────
// POST /v1/admin/pending-edits/{edit_id}/resolve
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EditResolution {
    /// Accept the held change and write it to the live profile
    Apply,
    /// Drop the held change; the live value stays as-is
    Discard,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResolveEditRequest {
    pub action: EditResolution,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResolveEditResponse {
    pub edit_id: Uuid,
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/v1/admin/pending-edits/{edit_id}/resolve",
    params(("edit_id" = Uuid, Path, description = "Pending edit to resolve")),
    request_body = ResolveEditRequest,
    responses(
        (status = 200, description = "Edit resolved", body = ResolveEditResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 403, description = "Not staff", body = mm_core::error::ApiError),
        (status = 404, description = "Pending edit not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn resolve_pending_edit(
    admin: AuthenticatedUser,
    State(state): State<AppState>,
    Path(edit_id): Path<Uuid>,
    AppJson(req): AppJson<ResolveEditRequest>,
) -> Result<Json<ResolveEditResponse>, AppError> {
    require_admin(&admin, "POST /v1/admin/pending-edits/{id}/resolve")?;

    let row: Option<(Uuid, String, String)> = sqlx::query_as(
        "SELECT profile_id, field_name, new_value FROM pending_edits \
         WHERE id = $1 AND status = 'pending_review'",
    )
    .bind(edit_id)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Database)?;

    let Some((profile_id, field_name, new_value)) = row else {
        return Err(AppError::NotFound {
            resource: format!("Pending edit {edit_id}"),
        });
    };

    let status = match req.action {
        EditResolution::Apply => {
            if !is_moderated_text_field(&field_name) {
                return Err(AppError::Internal(format!(
                    "pending edit targets unexpected field '{field_name}'"
                )));
            }
            crate::routes::profiles::apply_moderated_field(
                &state.db,
                profile_id,
                &field_name,
                &new_value,
            )
            .await?;
            "applied"
        }
        EditResolution::Discard => "discarded",
    };

    sqlx::query("UPDATE pending_edits SET status = $2, resolved_at = NOW() WHERE id = $1")
        .bind(edit_id)
        .bind(status)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;

    // With nothing left pending, a block imposed by held content can lift.
    let remaining: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pending_edits \
         WHERE profile_id = $1 AND status = 'pending_review'",
    )
    .bind(profile_id)
    .fetch_one(&state.db)
    .await
    .map_err(AppError::Database)?;

    if remaining == 0 {
        sqlx::query(
            "UPDATE profiles SET auto_moderation = 'auto_passed', updated_at = NOW() \
             WHERE id = $1 AND auto_moderation IN ('auto_flagged', 'auto_blocked')",
        )
        .bind(profile_id)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;
    }

    tracing::info!(
        admin_user_id = %admin.user_id,
        edit_id = %edit_id,
        profile_id = %profile_id,
        field = %field_name,
        resolution = status,
        "pending edit resolved"
    );

    Ok(Json(ResolveEditResponse {
        edit_id,
        status: status.to_string(),
    }))
}

// ──────────────────────────────────────────────
// POST /v1/admin/users/{user_id}/suspend | reinstate
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SuspensionResponse {
    pub user_id: Uuid,
    pub is_active: bool,
}

/// Suspend an account. The profile drops to the blocked stage and stays
/// there until a reinstate; nothing the user does can exit it.
#[utoipa::path(
    post,
    path = "/v1/admin/users/{user_id}/suspend",
    params(("user_id" = Uuid, Path, description = "User to suspend")),
    responses(
        (status = 200, description = "User suspended", body = SuspensionResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 403, description = "Not staff", body = mm_core::error::ApiError),
        (status = 404, description = "User not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn suspend_user(
    admin: AuthenticatedUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SuspensionResponse>, AppError> {
    require_admin(&admin, "POST /v1/admin/users/{id}/suspend")?;
    set_user_active(&state, &admin, user_id, false).await
}

#[utoipa::path(
    post,
    path = "/v1/admin/users/{user_id}/reinstate",
    params(("user_id" = Uuid, Path, description = "User to reinstate")),
    responses(
        (status = 200, description = "User reinstated", body = SuspensionResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 403, description = "Not staff", body = mm_core::error::ApiError),
        (status = 404, description = "User not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reinstate_user(
    admin: AuthenticatedUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SuspensionResponse>, AppError> {
    require_admin(&admin, "POST /v1/admin/users/{id}/reinstate")?;
    set_user_active(&state, &admin, user_id, true).await
}

async fn set_user_active(
    state: &AppState,
    admin: &AuthenticatedUser,
    user_id: Uuid,
    is_active: bool,
) -> Result<Json<SuspensionResponse>, AppError> {
    let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
        .bind(user_id)
        .bind(is_active)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound {
            resource: format!("User {user_id}"),
        });
    }

    // Suspension pulls any public listing immediately.
    if !is_active {
        sqlx::query(
            "UPDATE profiles SET publication_status = 'private', \
                 onboarding_stage = 'blocked', updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;
    }

    tracing::info!(
        admin_user_id = %admin.user_id,
        target_user_id = %user_id,
        is_active,
        "account suspension state changed"
    );

    Ok(Json(SuspensionResponse { user_id, is_active }))
}
