use serde::Serialize;
use utoipa::ToSchema;

/// Structured error response shared by the API and the CLI.
/// Validation failures carry enough detail for the caller to render
/// actionable UI; infrastructure failures stay generic on the wire.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "profile_incomplete", "not_found")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Structured diagnostic payload, e.g. the full missing-requirements list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const PROFILE_INCOMPLETE: &str = "profile_incomplete";
    pub const ALREADY_SUBMITTED: &str = "already_submitted";
    pub const DUPLICATE_SUBSCRIPTION: &str = "duplicate_subscription";
    pub const MODERATION_SERVICE_ERROR: &str = "moderation_service_error";
}
