use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Internal store
    pub store_base_url: String,
    pub store_token: Option<String>,

    // Shared seen-index. None disables the local dedup gate entirely;
    // store-level dedup remains authoritative either way.
    pub seen_index_url: Option<String>,

    // Source credentials
    pub github_token: Option<String>,
    pub kaggle_username: Option<String>,
    pub kaggle_key: Option<String>,

    // Outbound identification
    pub user_agent: String,

    // Default lookback when the trigger doesn't pass a window start
    pub window_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            store_base_url: required_env("STORE_BASE_URL"),
            store_token: env::var("STORE_TOKEN").ok(),
            seen_index_url: env::var("SEEN_INDEX_URL").ok(),
            github_token: env::var("GITHUB_TOKEN").ok(),
            kaggle_username: env::var("KAGGLE_USERNAME").ok(),
            kaggle_key: env::var("KAGGLE_KEY").ok(),
            user_agent: env::var("INGEST_USER_AGENT")
                .unwrap_or_else(|_| "devradar-ingest/0.1".to_string()),
            window_hours: env::var("WINDOW_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("WINDOW_HOURS must be a number"),
        }
    }

    /// Log the loaded configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            store_base_url = %self.store_base_url,
            seen_index = self.seen_index_url.is_some(),
            github_auth = self.github_token.is_some(),
            window_hours = self.window_hours,
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
