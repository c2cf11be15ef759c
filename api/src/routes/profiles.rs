use std::sync::LazyLock;

use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Json, Router};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mm_core::moderation::{AutoModeration, ModerationOutcome, is_moderated_text_field};
use mm_core::profiles::{AdminStatus, OnboardingStage, Profile, PublicationStatus};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::moderation;
use crate::state::AppState;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

pub fn read_router() -> Router<AppState> {
    Router::new().route("/v1/profiles/me", get(get_own_profile))
}

pub fn write_router() -> Router<AppState> {
    Router::new().route("/v1/profiles/me", patch(update_own_profile))
}

#[derive(sqlx::FromRow)]
pub(crate) struct FullProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub headline: Option<String>,
    pub about: Option<String>,
    pub services_description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub slug: Option<String>,
    pub photo_url: Option<String>,
    pub onboarding_stage: String,
    pub admin_status: String,
    pub publication_status: String,
    pub auto_moderation: String,
    pub available_now: bool,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl FullProfileRow {
    pub(crate) fn into_profile(self) -> Result<Profile, AppError> {
        Ok(Profile {
            id: self.id,
            user_id: self.user_id,
            display_name: self.display_name,
            headline: self.headline,
            about: self.about,
            services_description: self.services_description,
            city: self.city,
            state: self.state,
            slug: self.slug,
            photo_url: self.photo_url,
            onboarding_stage: self.onboarding_stage.parse::<OnboardingStage>()?,
            admin_status: self.admin_status.parse::<AdminStatus>()?,
            publication_status: self.publication_status.parse::<PublicationStatus>()?,
            auto_moderation: self.auto_moderation.parse::<AutoModeration>()?,
            available_now: self.available_now,
            submitted_at: self.submitted_at,
            approved_at: self.approved_at,
        })
    }
}

pub(crate) async fn load_own_profile(
    pool: &sqlx::PgPool,
    user_id: Uuid,
) -> Result<FullProfileRow, AppError> {
    sqlx::query_as::<_, FullProfileRow>(
        "SELECT id, user_id, display_name, headline, about, services_description, \
                city, state, slug, photo_url, onboarding_stage, admin_status, \
                publication_status, auto_moderation, available_now, submitted_at, approved_at \
         FROM profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Database)?
    .ok_or_else(|| AppError::NotFound {
        resource: format!("Profile for user {user_id}"),
    })
}

// ──────────────────────────────────────────────
// GET /v1/profiles/me
// ──────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/v1/profiles/me",
    responses(
        (status = 200, description = "The caller's profile", body = Profile),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn get_own_profile(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, AppError> {
    let row = load_own_profile(&state.db, user.user_id).await?;
    Ok(Json(row.into_profile()?))
}

// ──────────────────────────────────────────────
// PATCH /v1/profiles/me
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub services_description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PendingField {
    pub field: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UpdateProfileResponse {
    /// Fields written to the live profile
    pub updated: Vec<String>,
    /// True when at least one field was held for manual review
    pub pending_review: bool,
    /// Fields held for review, with the reasons
    pub pending: Vec<PendingField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Update profile text fields. Moderated fields pass through the content
/// gate: approved values write immediately; flagged or blocked values are
/// never written — the change is parked as a pending edit for staff, with
/// the live value left untouched.
#[utoipa::path(
    patch,
    path = "/v1/profiles/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Update outcome per field", body = UpdateProfileResponse),
        (status = 400, description = "Validation error", body = mm_core::error::ApiError),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError),
        (status = 404, description = "Profile not found", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn update_own_profile(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let profile = load_own_profile(&state.db, user.user_id).await?;

    if let Some(slug) = req.slug.as_deref() {
        validate_slug(slug)?;
    }

    let moderated_changes: Vec<(&str, &str, Option<&str>)> = [
        ("display_name", &req.display_name, &profile.display_name),
        ("headline", &req.headline, &profile.headline),
        ("about", &req.about, &profile.about),
        (
            "services_description",
            &req.services_description,
            &profile.services_description,
        ),
    ]
    .into_iter()
    .filter_map(|(field, new_value, old_value)| {
        new_value
            .as_deref()
            .map(|value| (field, value, old_value.as_deref()))
    })
    .collect();

    let direct_changes: Vec<(&str, &str)> = [
        ("city", &req.city),
        ("state", &req.state),
        ("slug", &req.slug),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.as_deref().map(|value| (field, value)))
    .collect();

    if moderated_changes.is_empty() && direct_changes.is_empty() {
        return Err(AppError::Validation {
            message: "No fields to update".to_string(),
            field: None,
            received: None,
            docs_hint: Some("Provide at least one updatable field.".to_string()),
        });
    }

    let mut updated: Vec<String> = Vec::new();
    let mut pending: Vec<PendingField> = Vec::new();
    let mut worst_outcome = ModerationOutcome::AutoPassed;

    for (field, new_value, old_value) in &moderated_changes {
        debug_assert!(is_moderated_text_field(field));

        let review = moderation::check_text(&state.moderation, new_value).await;
        tracing::info!(
            profile_id = %profile.id,
            field = field,
            outcome = ?review.outcome,
            "text moderation decision"
        );

        match review.outcome {
            ModerationOutcome::AutoPassed => {
                write_profile_field(&state.db, profile.id, field, new_value).await?;
                updated.push(field.to_string());
            }
            outcome => {
                if severity(outcome) > severity(worst_outcome) {
                    worst_outcome = outcome;
                }
                sqlx::query(
                    "INSERT INTO pending_edits \
                         (id, profile_id, field_name, old_value, new_value, reasons, status) \
                     VALUES ($1, $2, $3, $4, $5, $6, 'pending_review')",
                )
                .bind(Uuid::now_v7())
                .bind(profile.id)
                .bind(field)
                .bind(old_value)
                .bind(new_value)
                .bind(&review.reasons)
                .execute(&state.db)
                .await
                .map_err(AppError::Database)?;

                pending.push(PendingField {
                    field: field.to_string(),
                    reasons: review.reasons,
                });
            }
        }
    }

    for (field, value) in &direct_changes {
        write_profile_field(&state.db, profile.id, field, value).await?;
        updated.push(field.to_string());
    }

    if !moderated_changes.is_empty() {
        update_auto_moderation(&state.db, profile.id, &profile.auto_moderation, worst_outcome)
            .await?;
    }

    let pending_review = !pending.is_empty();
    let message = pending_review.then(|| {
        "Some changes need a manual check before going live. \
         Your current profile text stays up in the meantime."
            .to_string()
    });

    Ok(Json(UpdateProfileResponse {
        updated,
        pending_review,
        pending,
        message,
    }))
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > 64 || !SLUG_RE.is_match(slug) {
        return Err(AppError::Validation {
            message: "slug must be lowercase letters, digits, and single hyphens".to_string(),
            field: Some("slug".to_string()),
            received: Some(serde_json::Value::String(slug.to_string())),
            docs_hint: Some("Example: 'alex-smith-austin'".to_string()),
        });
    }
    Ok(())
}

/// Column names come from the fixed field lists above, never from input.
async fn write_profile_field(
    pool: &sqlx::PgPool,
    profile_id: Uuid,
    field: &str,
    value: &str,
) -> Result<(), AppError> {
    let query = match field {
        "display_name" => "UPDATE profiles SET display_name = $2, updated_at = NOW() WHERE id = $1",
        "headline" => "UPDATE profiles SET headline = $2, updated_at = NOW() WHERE id = $1",
        "about" => "UPDATE profiles SET about = $2, updated_at = NOW() WHERE id = $1",
        "services_description" => {
            "UPDATE profiles SET services_description = $2, updated_at = NOW() WHERE id = $1"
        }
        "city" => "UPDATE profiles SET city = $2, updated_at = NOW() WHERE id = $1",
        "state" => "UPDATE profiles SET state = $2, updated_at = NOW() WHERE id = $1",
        "slug" => "UPDATE profiles SET slug = $2, updated_at = NOW() WHERE id = $1",
        other => {
            return Err(AppError::Internal(format!(
                "attempted write to unknown profile field '{other}'"
            )));
        }
    };

    sqlx::query(query)
        .bind(profile_id)
        .bind(value)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

/// Staff-approved write of a previously held field value.
pub(crate) async fn apply_moderated_field(
    pool: &sqlx::PgPool,
    profile_id: Uuid,
    field: &str,
    value: &str,
) -> Result<(), AppError> {
    write_profile_field(pool, profile_id, field, value).await
}

fn severity(outcome: ModerationOutcome) -> u8 {
    match outcome {
        ModerationOutcome::AutoPassed => 0,
        ModerationOutcome::AutoFlagged => 1,
        ModerationOutcome::AutoBlocked => 2,
    }
}

/// Escalate the profile-level moderation state. A block sticks until staff
/// resolve the offending pending edit; passes only upgrade from draft or
/// flagged.
async fn update_auto_moderation(
    pool: &sqlx::PgPool,
    profile_id: Uuid,
    current: &str,
    worst: ModerationOutcome,
) -> Result<(), AppError> {
    let new_state = match worst {
        ModerationOutcome::AutoBlocked => AutoModeration::AutoBlocked,
        ModerationOutcome::AutoFlagged if current != "auto_blocked" => {
            AutoModeration::AutoFlagged
        }
        ModerationOutcome::AutoPassed if current != "auto_blocked" => AutoModeration::AutoPassed,
        _ => return Ok(()),
    };

    sqlx::query("UPDATE profiles SET auto_moderation = $2, updated_at = NOW() WHERE id = $1")
        .bind(profile_id)
        .bind(new_state.as_str())
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_validation_accepts_city_slugs() {
        assert!(validate_slug("austin-tx").is_ok());
        assert!(validate_slug("new-york-ny").is_ok());
        assert!(validate_slug("a1").is_ok());
    }

    #[test]
    fn slug_validation_rejects_bad_shapes() {
        for slug in ["", "Austin", "austin_tx", "-austin", "austin-", "a--b", "a b"] {
            assert!(validate_slug(slug).is_err(), "slug {slug:?} should fail");
        }
    }

    #[test]
    fn blocked_outranks_flagged() {
        assert!(severity(ModerationOutcome::AutoBlocked) > severity(ModerationOutcome::AutoFlagged));
        assert!(severity(ModerationOutcome::AutoFlagged) > severity(ModerationOutcome::AutoPassed));
    }
}
