use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::util::{StoredCredentials, client, exit_error, save_credentials};

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Log in with email/password and store the issued token. The password is
/// read from MM_PASSWORD or prompted on stdin, never taken as an argument
/// (it would land in shell history).
pub async fn run(api_url: &str, email: &str) -> i32 {
    let password = match std::env::var("MM_PASSWORD") {
        Ok(value) if !value.is_empty() => value,
        _ => prompt_password(),
    };

    let resp = client()
        .post(format!("{api_url}/v1/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await;

    let resp = match resp {
        Ok(r) => r,
        Err(e) => exit_error(
            &format!("Connection failed: {e}"),
            Some("Is the API server running? Check MM_API_URL."),
        ),
    };

    if !resp.status().is_success() {
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap());
        return 1;
    }

    let login: LoginResponse = match resp.json().await {
        Ok(v) => v,
        Err(e) => exit_error(&format!("Unexpected login response: {e}"), None),
    };

    let creds = StoredCredentials {
        api_url: api_url.to_string(),
        access_token: login.access_token,
        expires_at: login.expires_at,
    };
    if let Err(e) = save_credentials(&creds) {
        exit_error(&format!("Failed to store credentials: {e}"), None);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "message": "Logged in.",
            "expires_at": creds.expires_at,
        }))
        .unwrap()
    );
    0
}

fn prompt_password() -> String {
    eprint!("Password: ");
    let mut buf = String::new();
    if std::io::stdin().read_line(&mut buf).is_err() || buf.trim().is_empty() {
        exit_error(
            "Password is required",
            Some("Set MM_PASSWORD or enter it at the prompt."),
        );
    }
    buf.trim_end_matches(['\r', '\n']).to_string()
}
