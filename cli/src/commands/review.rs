use serde_json::json;

use crate::util::api_request;

pub async fn list(api_url: &str, token: &str) -> i32 {
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/admin/review-queue",
        Some(token),
        None,
    )
    .await
}

pub async fn resolve(
    api_url: &str,
    token: &str,
    profile_id: &str,
    action: &str,
    reason: Option<&str>,
) -> i32 {
    let mut body = json!({ "action": action });
    if let Some(reason) = reason {
        body["reason"] = json!(reason);
    }

    api_request(
        api_url,
        reqwest::Method::POST,
        &format!("/v1/admin/profiles/{profile_id}/review"),
        Some(token),
        Some(body),
    )
    .await
}
