use crate::util::api_request;

pub async fn status(api_url: &str, token: &str) -> i32 {
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/onboarding/status",
        Some(token),
        None,
    )
    .await
}

pub async fn show(api_url: &str, token: &str) -> i32 {
    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/profiles/me",
        Some(token),
        None,
    )
    .await
}
