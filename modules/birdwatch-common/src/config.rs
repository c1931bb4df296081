use std::env;
use std::path::PathBuf;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // RapidAPI credentials
    pub api_key: String,
    pub api_host: String,

    // Storage
    pub data_dir: PathBuf,

    // Rate-limit pacing between requests
    pub page_delay_ms: u64,
    pub reply_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            api_key: required_env("RAPIDAPI_KEY"),
            api_host: required_env("RAPIDAPI_HOST"),
            data_dir: env::var("BIRDWATCH_DATA_DIR")
                .unwrap_or_else(|_| "scraping".to_string())
                .into(),
            page_delay_ms: env::var("BIRDWATCH_PAGE_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("BIRDWATCH_PAGE_DELAY_MS must be a number"),
            reply_delay_ms: env::var("BIRDWATCH_REPLY_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .expect("BIRDWATCH_REPLY_DELAY_MS must be a number"),
        }
    }

    /// Log the effective configuration with the API key redacted.
    pub fn log_redacted(&self) {
        let key = if self.api_key.len() > 14 {
            format!(
                "{}...{}",
                &self.api_key[..10],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "<short key>".to_string()
        };
        info!(
            host = self.api_host.as_str(),
            api_key = key.as_str(),
            data_dir = %self.data_dir.display(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
