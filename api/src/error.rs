use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mm_core::error::{self, ApiError};
use mm_core::onboarding::Blocker;
use mm_core::profiles::ParseEnumError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Missing or invalid credentials (401)
    Unauthorized {
        message: String,
        docs_hint: Option<String>,
    },
    /// Authenticated but not allowed (403)
    Forbidden {
        message: String,
        docs_hint: Option<String>,
    },
    /// Missing user/profile/subscription record (404)
    NotFound { resource: String },
    /// Submission attempted without meeting requirements (422) — carries
    /// the full missing-requirements list, never just the first
    ProfileIncomplete { missing: Vec<Blocker> },
    /// Duplicate submission attempt while review is pending (409)
    AlreadySubmitted,
    /// Plan selection while a trialing/active subscription exists (409)
    DuplicateSubscription,
    /// Database error (500)
    Database(sqlx::Error),
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    details: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Unauthorized { message, docs_hint } => (
                StatusCode::UNAUTHORIZED,
                ApiError {
                    error: error::codes::UNAUTHORIZED.to_string(),
                    message,
                    field: None,
                    received: None,
                    details: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Forbidden { message, docs_hint } => (
                StatusCode::FORBIDDEN,
                ApiError {
                    error: error::codes::FORBIDDEN.to_string(),
                    message,
                    field: None,
                    received: None,
                    details: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    details: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::ProfileIncomplete { missing } => {
                let requirements: Vec<&str> =
                    missing.iter().map(|blocker| blocker.as_str()).collect();
                let messages: Vec<&str> =
                    missing.iter().map(|blocker| blocker.message()).collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ApiError {
                        error: error::codes::PROFILE_INCOMPLETE.to_string(),
                        message: "Profile does not meet the submission requirements".to_string(),
                        field: None,
                        received: None,
                        details: Some(serde_json::json!({
                            "missing": requirements,
                            "messages": messages,
                        })),
                        request_id,
                        docs_hint: Some(
                            "Resolve every listed requirement, then submit again. \
                             GET /v1/onboarding/status shows live progress."
                                .to_string(),
                        ),
                    },
                )
            }
            AppError::AlreadySubmitted => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::ALREADY_SUBMITTED.to_string(),
                    message: "Profile is already awaiting review".to_string(),
                    field: None,
                    received: None,
                    details: None,
                    request_id,
                    docs_hint: Some(
                        "A reviewer will pick it up shortly; no further action is needed."
                            .to_string(),
                    ),
                },
            ),
            AppError::DuplicateSubscription => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::DUPLICATE_SUBSCRIPTION.to_string(),
                    message: "An active or trialing subscription already exists".to_string(),
                    field: None,
                    received: None,
                    details: None,
                    request_id,
                    docs_hint: Some(
                        "Cancel or change the current subscription instead of creating a new one."
                            .to_string(),
                    ),
                },
            ),
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);

                // Surface unique-constraint violations as conflicts rather
                // than opaque 500s.
                if let sqlx::Error::Database(ref db_err) = err {
                    if db_err.code().as_deref() == Some("23505") {
                        return (
                            StatusCode::CONFLICT,
                            Json(ApiError {
                                error: error::codes::CONFLICT.to_string(),
                                message: "A conflicting record already exists".to_string(),
                                field: None,
                                received: None,
                                details: None,
                                request_id,
                                docs_hint: None,
                            }),
                        )
                            .into_response();
                    }
                }

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        details: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        details: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<ParseEnumError> for AppError {
    fn from(err: ParseEnumError) -> Self {
        AppError::Internal(err.to_string())
    }
}
