//! Media storage client.
//!
//! Uploads happen directly from the client against the storage service; the
//! API only ever deletes objects (rejected uploads must not persist).

use url::Url;

use crate::state::StorageConfig;

/// Whether a submitted storage URL points at our storage service. Uploads
/// referencing arbitrary hosts are rejected at validation time.
pub fn is_managed_url(config: &StorageConfig, raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if url.scheme() != "https" {
        return false;
    }
    let Some(endpoint) = config.endpoint.as_deref() else {
        // Without a configured endpoint any https URL is accepted (dev mode).
        return true;
    };
    match Url::parse(endpoint) {
        Ok(base) => url.host_str() == base.host_str(),
        Err(_) => false,
    }
}

/// Delete an object from storage. Failures are logged, never surfaced: the
/// asset row already records the rejection, and a leaked object is an
/// operational cleanup, not a user-facing error.
pub async fn delete_object(config: &StorageConfig, object_url: &str) {
    let Some(token) = config.auth_token.as_deref() else {
        tracing::warn!(object_url, "storage token not configured, skipping object deletion");
        return;
    };

    let result = reqwest::Client::new()
        .delete(object_url)
        .bearer_auth(token)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            tracing::info!(object_url, "deleted rejected object from storage");
        }
        Ok(response) => {
            tracing::warn!(
                object_url,
                status = %response.status(),
                "storage deletion returned non-success status"
            );
        }
        Err(err) => {
            tracing::warn!(object_url, error = %err, "storage deletion request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StorageConfig;

    fn config(endpoint: Option<&str>) -> StorageConfig {
        StorageConfig {
            endpoint: endpoint.map(str::to_string),
            auth_token: Some("token".to_string()),
        }
    }

    #[test]
    fn accepts_urls_on_the_configured_host() {
        let config = config(Some("https://media.masseurmatch.com"));
        assert!(is_managed_url(
            &config,
            "https://media.masseurmatch.com/uploads/abc.jpg"
        ));
    }

    #[test]
    fn rejects_foreign_hosts_and_plain_http() {
        let config = config(Some("https://media.masseurmatch.com"));
        assert!(!is_managed_url(&config, "https://evil.example/abc.jpg"));
        assert!(!is_managed_url(
            &config,
            "http://media.masseurmatch.com/abc.jpg"
        ));
        assert!(!is_managed_url(&config, "not a url"));
    }

    #[test]
    fn dev_mode_accepts_any_https_url() {
        let config = config(None);
        assert!(is_managed_url(&config, "https://anything.example/a.jpg"));
        assert!(!is_managed_url(&config, "ftp://anything.example/a.jpg"));
    }
}
