use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mm_core::moderation::ModerationOutcome;
use mm_core::plans::{self, Entitlement, MediaKind, PlanTier};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::facts::load_profile_facts;
use crate::moderation;
use crate::routes::profiles::load_own_profile;
use crate::state::AppState;
use crate::storage;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/profiles/me/media", post(upload_media))
        .route("/v1/profiles/me/media/{asset_id}", delete(delete_media))
}

// ──────────────────────────────────────────────
// POST /v1/profiles/me/media
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UploadMediaRequest {
    pub kind: MediaKind,
    /// URL of the object the client already uploaded to the storage service
    pub storage_url: String,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub is_cover: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MediaLimits {
    pub plan: PlanTier,
    pub current: i64,
    pub limit: i64,
    pub remaining: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadMediaResponse {
    pub approved: bool,
    /// True when the asset is held for manual review rather than rejected
    pub pending_review: bool,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<Uuid>,
    pub limits: MediaLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_message: Option<String>,
}

/// Register an uploaded media object. The plan entitlement is checked
/// against freshly-read counts, then the image passes automated moderation:
/// blocked uploads are removed from storage immediately and never touch the
/// profile; flagged uploads are held for staff.
#[utoipa::path(
    post,
    path = "/v1/profiles/me/media",
    request_body = UploadMediaRequest,
    responses(
        (status = 200, description = "Upload outcome", body = UploadMediaResponse),
        (status = 400, description = "Validation error", body = mm_core::error::ApiError),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "media"
)]
pub async fn upload_media(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<UploadMediaRequest>,
) -> Result<Json<UploadMediaResponse>, AppError> {
    if !storage::is_managed_url(&state.storage, &req.storage_url) {
        return Err(AppError::Validation {
            message: "storage_url must point at the MasseurMatch storage service".to_string(),
            field: Some("storage_url".to_string()),
            received: Some(serde_json::Value::String(req.storage_url.clone())),
            docs_hint: Some("Upload the file first, then register the returned URL.".to_string()),
        });
    }

    let profile = load_own_profile(&state.db, user.user_id).await?;
    let facts = load_profile_facts(&state.db, user.user_id).await?;
    let plan = facts.plan.unwrap_or(PlanTier::Free);

    // Fresh per-kind count; pending uploads occupy a slot until resolved.
    let current: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM media_assets \
         WHERE profile_id = $1 AND kind = $2 AND status IN ('pending', 'approved')",
    )
    .bind(profile.id)
    .bind(req.kind.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(AppError::Database)?;

    let entitlement = plans::can_upload_photo(plan, req.kind, current);
    if !entitlement.allowed {
        // The object was already uploaded; don't leave it orphaned.
        storage::delete_object(&state.storage, &req.storage_url).await;

        return Ok(Json(UploadMediaResponse {
            approved: false,
            pending_review: false,
            reasons: vec![format!(
                "{} limit reached for the {} plan",
                req.kind.as_str(),
                plan.as_str()
            )],
            asset_id: None,
            limits: media_limits(plan, current, entitlement),
            upgrade_message: plans::upgrade_message(plan).map(str::to_string),
        }));
    }

    let review = moderation::check_image_url(&state.moderation, &req.storage_url).await;
    tracing::info!(
        profile_id = %profile.id,
        kind = req.kind.as_str(),
        outcome = ?review.outcome,
        clean_score = ?review.clean_score,
        "image moderation decision"
    );

    let (status, approved, pending_review) = match review.outcome {
        ModerationOutcome::AutoPassed => ("approved", true, false),
        ModerationOutcome::AutoFlagged => ("pending", false, true),
        ModerationOutcome::AutoBlocked => ("rejected", false, false),
    };

    let asset_id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO media_assets \
             (id, profile_id, kind, storage_url, status, clean_score, reject_reasons, \
              position, is_cover) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(asset_id)
    .bind(profile.id)
    .bind(req.kind.as_str())
    .bind(&req.storage_url)
    .bind(status)
    .bind(review.clean_score)
    .bind(&review.reasons)
    .bind(req.position.unwrap_or(0))
    .bind(req.is_cover)
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    match review.outcome {
        ModerationOutcome::AutoBlocked => {
            // Rejected objects never persist in storage, and profile/gallery
            // rejections never touch the profile's photo field.
            storage::delete_object(&state.storage, &req.storage_url).await;
        }
        ModerationOutcome::AutoPassed => {
            if req.kind == MediaKind::Profile {
                sqlx::query(
                    "UPDATE profiles SET photo_url = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(profile.id)
                .bind(&req.storage_url)
                .execute(&state.db)
                .await
                .map_err(AppError::Database)?;
            }
        }
        ModerationOutcome::AutoFlagged => {}
    }

    let after = if status == "rejected" {
        current
    } else {
        current + 1
    };
    let limits = media_limits(plan, after, plans::can_upload_photo(plan, req.kind, after));

    Ok(Json(UploadMediaResponse {
        approved,
        pending_review,
        reasons: review.reasons,
        asset_id: Some(asset_id),
        limits,
        upgrade_message: None,
    }))
}

fn media_limits(plan: PlanTier, current: i64, entitlement: Entitlement) -> MediaLimits {
    MediaLimits {
        plan,
        current,
        limit: entitlement.limit,
        remaining: entitlement.remaining,
    }
}

// ──────────────────────────────────────────────
// DELETE /v1/profiles/me/media/{asset_id}
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MediaDeletedResponse {
    pub asset_id: Uuid,
    pub message: String,
}

#[utoipa::path(
    delete,
    path = "/v1/profiles/me/media/{asset_id}",
    params(("asset_id" = Uuid, Path, description = "Asset to delete")),
    responses(
        (status = 200, description = "Asset deleted", body = MediaDeletedResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Asset not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "media"
)]
pub async fn delete_media(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<MediaDeletedResponse>, AppError> {
    let profile = load_own_profile(&state.db, user.user_id).await?;

    let row: Option<(String, String)> = sqlx::query_as(
        "DELETE FROM media_assets WHERE id = $1 AND profile_id = $2 \
         RETURNING storage_url, kind",
    )
    .bind(asset_id)
    .bind(profile.id)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Database)?;

    let Some((storage_url, kind)) = row else {
        return Err(AppError::NotFound {
            resource: format!("Media asset {asset_id}"),
        });
    };

    if kind == "profile" && profile.photo_url.as_deref() == Some(storage_url.as_str()) {
        sqlx::query("UPDATE profiles SET photo_url = NULL, updated_at = NOW() WHERE id = $1")
            .bind(profile.id)
            .execute(&state.db)
            .await
            .map_err(AppError::Database)?;
    }

    storage::delete_object(&state.storage, &storage_url).await;

    Ok(Json(MediaDeletedResponse {
        asset_id,
        message: "Asset deleted.".to_string(),
    }))
}
