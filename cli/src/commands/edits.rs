use serde_json::json;

use crate::util::api_request;

pub async fn list(api_url: &str, token: &str) -> i32 {
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/admin/pending-edits",
        Some(token),
        None,
    )
    .await
}

pub async fn resolve(api_url: &str, token: &str, edit_id: &str, action: &str) -> i32 {
    api_request(
        api_url,
        reqwest::Method::POST,
        &format!("/v1/admin/pending-edits/{edit_id}/resolve"),
        Some(token),
        Some(json!({ "action": action })),
    )
    .await
}
