use sqlx::PgPool;

/// Moderation provider credentials and endpoint. Missing credentials are
/// tolerated at startup; every check then degrades to the flagged fallback.
#[derive(Clone, Debug)]
pub struct ModerationConfig {
    pub endpoint: String,
    pub api_user: Option<String>,
    pub api_secret: Option<String>,
    /// Comma-separated provider model list, e.g. "nudity-2.1,weapon,gore".
    pub models: String,
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("MM_MODERATION_ENDPOINT")
                .unwrap_or_else(|_| "https://api.sightengine.com/1.0".to_string()),
            api_user: env_nonempty("MM_MODERATION_API_USER"),
            api_secret: env_nonempty("MM_MODERATION_API_SECRET"),
            models: std::env::var("MM_MODERATION_MODELS")
                .unwrap_or_else(|_| "nudity-2.1,weapon,gore,offensive,text-content".to_string()),
        }
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.api_user.as_deref(), self.api_secret.as_deref()) {
            (Some(user), Some(secret)) => Some((user, secret)),
            _ => None,
        }
    }
}

/// Media storage service used for deleting rejected uploads.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_nonempty("MM_STORAGE_ENDPOINT"),
            auth_token: env_nonempty("MM_STORAGE_TOKEN"),
        }
    }
}

/// Billing webhook verification secret.
#[derive(Clone, Debug)]
pub struct BillingConfig {
    pub webhook_secret: Option<String>,
}

impl BillingConfig {
    pub fn from_env() -> Self {
        Self {
            webhook_secret: env_nonempty("MM_BILLING_WEBHOOK_SECRET"),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub moderation: ModerationConfig,
    pub storage: StorageConfig,
    pub billing: BillingConfig,
}
