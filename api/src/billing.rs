//! Billing provider webhook plumbing: signature verification and event
//! payload parsing. Subscription state only ever changes through these
//! events once a provider subscription exists.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use mm_core::subscriptions::SubscriptionStatus;

type HmacSha256 = Hmac<Sha256>;

/// Reject events whose signature timestamp is older than this.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("signature digest mismatch")]
    DigestMismatch,
}

/// Verify a `t=<unix>,v1=<hex>` signature header over `"{t}.{payload}"`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signature = hex::decode(value).ok(),
            _ => {}
        }
    }

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(SignatureError::MalformedHeader),
    };

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::DigestMismatch)
}

/// Compute the signature header for a payload. Used by tests and the CLI's
/// webhook replay tooling.
pub fn sign_payload(secret: &str, payload: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={digest}")
}

/// One webhook event from the billing provider.
#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: BillingSubscription,
}

/// Subscription snapshot carried by every subscription.* event.
#[derive(Debug, Deserialize)]
pub struct BillingSubscription {
    pub subscription_id: String,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    #[serde(default)]
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

impl BillingSubscription {
    pub fn trial_ends_at(&self) -> Option<DateTime<Utc>> {
        self.trial_end.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        self.current_period_start
            .and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .and_then(|t| DateTime::from_timestamp(t, 0))
    }
}

/// Map the provider's status vocabulary onto ours. Unknown statuses are the
/// caller's problem (log and skip the event).
pub fn map_provider_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "trialing" => Some(SubscriptionStatus::Trialing),
        "active" => Some(SubscriptionStatus::Active),
        "past_due" | "unpaid" => Some(SubscriptionStatus::PastDue),
        "canceled" | "incomplete_expired" => Some(SubscriptionStatus::Canceled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &str = r#"{"id":"evt_1","type":"subscription.updated"}"#;

    #[test]
    fn signature_roundtrip_verifies() {
        let now = 1_770_000_000;
        let header = sign_payload(SECRET, PAYLOAD, now);
        assert_eq!(verify_signature(SECRET, &header, PAYLOAD, now), Ok(()));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let now = 1_770_000_000;
        let header = sign_payload(SECRET, PAYLOAD, now - SIGNATURE_TOLERANCE_SECS - 1);
        assert_eq!(
            verify_signature(SECRET, &header, PAYLOAD, now),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = 1_770_000_000;
        let header = sign_payload(SECRET, PAYLOAD, now);
        assert_eq!(
            verify_signature(SECRET, &header, r#"{"id":"evt_2"}"#, now),
            Err(SignatureError::DigestMismatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = 1_770_000_000;
        let header = sign_payload("whsec_other", PAYLOAD, now);
        assert_eq!(
            verify_signature(SECRET, &header, PAYLOAD, now),
            Err(SignatureError::DigestMismatch)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let now = 1_770_000_000;
        for header in ["", "t=abc,v1=zz", "v1=00ff", "t=123"] {
            assert_eq!(
                verify_signature(SECRET, header, PAYLOAD, now),
                Err(SignatureError::MalformedHeader),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn provider_status_vocabulary_maps_onto_ours() {
        assert_eq!(
            map_provider_status("trialing"),
            Some(SubscriptionStatus::Trialing)
        );
        assert_eq!(
            map_provider_status("unpaid"),
            Some(SubscriptionStatus::PastDue)
        );
        assert_eq!(
            map_provider_status("canceled"),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(map_provider_status("paused"), None);
    }

    #[test]
    fn event_payload_parses_with_unix_timestamps() {
        let raw = r#"{
            "id": "evt_42",
            "type": "subscription.created",
            "data": {
                "subscription_id": "sub_123",
                "user_id": "0195d6a8-6f0a-7b3c-9a66-3a4b5c6d7e8f",
                "plan": "pro",
                "status": "trialing",
                "trial_end": 1772000000,
                "current_period_start": 1770000000,
                "current_period_end": 1772678400
            }
        }"#;

        let event: BillingEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "subscription.created");
        assert_eq!(event.data.plan, "pro");
        assert!(event.data.trial_ends_at().is_some());
        assert!(event.data.period_end().unwrap() > event.data.period_start().unwrap());
    }
}
