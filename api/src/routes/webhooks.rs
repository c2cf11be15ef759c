use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::billing::{self, BillingEvent};
use crate::error::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "mm-billing-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/webhooks/billing", post(billing_webhook))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    /// True when the event type or status was unknown and skipped
    pub ignored: bool,
}

/// Billing provider webhook. Signature-verified, then applied as an
/// idempotent upsert keyed on the provider's subscription id — replaying an
/// event produces no duplicate row and the same final state.
#[utoipa::path(
    post,
    path = "/v1/webhooks/billing",
    responses(
        (status = 200, description = "Event processed or skipped", body = WebhookAck),
        (status = 401, description = "Signature verification failed", body = mm_core::error::ApiError)
    ),
    tag = "billing"
)]
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, AppError> {
    let Some(secret) = state.billing.webhook_secret.as_deref() else {
        return Err(AppError::Internal(
            "MM_BILLING_WEBHOOK_SECRET must be configured".to_string(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("Missing {SIGNATURE_HEADER} header"),
            docs_hint: None,
        })?;

    billing::verify_signature(secret, signature, &body, Utc::now().timestamp()).map_err(
        |err| {
            tracing::warn!(error = %err, "billing webhook signature rejected");
            AppError::Unauthorized {
                message: "Webhook signature verification failed".to_string(),
                docs_hint: None,
            }
        },
    )?;

    let event: BillingEvent = serde_json::from_str(&body).map_err(|err| AppError::Validation {
        message: format!("Invalid webhook payload: {err}"),
        field: Some("body".to_string()),
        received: None,
        docs_hint: None,
    })?;

    if !event.event_type.starts_with("subscription.") {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "ignoring non-subscription event");
        return Ok(Json(WebhookAck {
            received: true,
            ignored: true,
        }));
    }

    let Some(status) = billing::map_provider_status(&event.data.status) else {
        tracing::warn!(
            event_id = %event.id,
            provider_status = %event.data.status,
            "unknown provider subscription status, skipping event"
        );
        return Ok(Json(WebhookAck {
            received: true,
            ignored: true,
        }));
    };
    let plan = event.data.plan.parse::<mm_core::plans::PlanTier>().map_err(|_| {
        AppError::Validation {
            message: format!("Unknown plan '{}'", event.data.plan),
            field: Some("data.plan".to_string()),
            received: Some(serde_json::Value::String(event.data.plan.clone())),
            docs_hint: None,
        }
    })?;

    // A locally-created trial has no provider id yet; claim it before the
    // upsert so the provider-confirmed row doesn't collide with the
    // one-active-per-user index.
    sqlx::query(
        "UPDATE subscriptions SET provider_subscription_id = $2 \
         WHERE user_id = $1 AND provider_subscription_id IS NULL \
           AND status IN ('trialing', 'active')",
    )
    .bind(event.data.user_id)
    .bind(&event.data.subscription_id)
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    sqlx::query(
        "INSERT INTO subscriptions \
             (id, user_id, plan, status, provider_subscription_id, trial_ends_at, \
              current_period_start, current_period_end) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (provider_subscription_id) DO UPDATE SET \
             plan = EXCLUDED.plan, \
             status = EXCLUDED.status, \
             trial_ends_at = EXCLUDED.trial_ends_at, \
             current_period_start = EXCLUDED.current_period_start, \
             current_period_end = EXCLUDED.current_period_end, \
             updated_at = NOW()",
    )
    .bind(Uuid::now_v7())
    .bind(event.data.user_id)
    .bind(plan.as_str())
    .bind(status.as_str())
    .bind(&event.data.subscription_id)
    .bind(event.data.trial_ends_at())
    .bind(event.data.period_start())
    .bind(event.data.period_end())
    .execute(&state.db)
    .await
    .map_err(AppError::Database)?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        user_id = %event.data.user_id,
        status = status.as_str(),
        "applied billing event"
    );

    Ok(Json(WebhookAck {
        received: true,
        ignored: false,
    }))
}
