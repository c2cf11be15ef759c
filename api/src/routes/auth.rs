use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mm_core::auth;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

const ACCESS_TOKEN_TTL_DAYS: i64 = 30;

pub fn register_router() -> Router<AppState> {
    Router::new().route("/v1/auth/register", post(register))
}

pub fn login_router() -> Router<AppState> {
    Router::new().route("/v1/auth/login", post(login))
}

pub fn logout_router() -> Router<AppState> {
    Router::new().route("/v1/auth/logout", post(logout))
}

// ──────────────────────────────────────────────
// POST /v1/auth/register
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub email: String,
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered with an empty profile", body = RegisterResponse),
        (status = 400, description = "Validation error", body = mm_core::error::ApiError),
        (status = 409, description = "Email already exists", body = mm_core::error::ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::Validation {
            message: "email must be a valid address".to_string(),
            field: Some("email".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation {
            message: "password must be at least 8 characters".to_string(),
            field: Some("password".to_string()),
            received: None,
            docs_hint: None,
        });
    }

    let password_hash = auth::hash_password(&req.password).map_err(AppError::Internal)?;

    let user_id = Uuid::now_v7();
    let profile_id = Uuid::now_v7();

    let mut tx = state.db.begin().await.map_err(AppError::Database)?;

    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(&req.email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.code().as_deref() == Some("23505") {
                    return AppError::Validation {
                        message: format!("Email '{}' is already registered", req.email),
                        field: Some("email".to_string()),
                        received: Some(serde_json::Value::String(req.email.clone())),
                        docs_hint: Some("Use a different email address.".to_string()),
                    };
                }
            }
            AppError::Database(e)
        })?;

    // The profile row exists from signup on; everything else is filled in
    // during onboarding.
    sqlx::query(
        "INSERT INTO profiles (id, user_id, display_name, onboarding_stage, admin_status, \
                               publication_status, auto_moderation) \
         VALUES ($1, $2, $3, 'start', 'draft', 'private', 'draft')",
    )
    .bind(profile_id)
    .bind(user_id)
    .bind(&req.display_name)
    .execute(&mut *tx)
    .await
    .map_err(AppError::Database)?;

    tx.commit().await.map_err(AppError::Database)?;

    tracing::info!(user_id = %user_id, profile_id = %profile_id, "registered new therapist account");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            profile_id,
            email: req.email,
        }),
    ))
}

// ──────────────────────────────────────────────
// POST /v1/auth/login
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: Uuid,
    password_hash: String,
    is_active: bool,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = mm_core::error::ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Unauthorized {
        message: "Invalid email or password".to_string(),
        docs_hint: None,
    };

    let row = sqlx::query_as::<_, LoginRow>(
        "SELECT id, password_hash, is_active FROM users WHERE email = $1",
    )
    .bind(&req.email)
    .fetch_optional(&state.db)
    .await
    .map_err(AppError::Database)?
    .ok_or_else(invalid)?;

    let verified =
        auth::verify_password(&req.password, &row.password_hash).map_err(AppError::Internal)?;
    if !verified {
        return Err(invalid());
    }
    if !row.is_active {
        return Err(AppError::Forbidden {
            message: "Account is suspended".to_string(),
            docs_hint: Some("Contact support to resolve the suspension.".to_string()),
        });
    }

    let (token, token_hash) = auth::generate_access_token();
    let token_id = Uuid::now_v7();
    let expires_at = Utc::now() + Duration::days(ACCESS_TOKEN_TTL_DAYS);

    sqlx::query(
        "INSERT INTO access_tokens (id, user_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(token_id)
    .bind(row.id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    tracing::info!(user_id = %row.id, token_prefix = %auth::token_prefix(&token), "issued access token");

    Ok(Json(LoginResponse {
        access_token: token,
        user_id: row.id,
        expires_at,
    }))
}

// ──────────────────────────────────────────────
// POST /v1/auth/logout
// ──────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Token revoked", body = LogoutResponse),
        (status = 401, description = "Not authenticated", body = mm_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<LogoutResponse>, AppError> {
    sqlx::query("UPDATE access_tokens SET is_revoked = TRUE WHERE id = $1")
        .bind(user.token_id)
        .execute(&state.db)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(LogoutResponse {
        message: "Token revoked.".to_string(),
    }))
}
