//! Environment-driven server configuration.

use std::env;

/// Runtime configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Empty disables disambiguation; the pipeline then keeps defaults.
    pub deepseek_api_key: String,
    pub deepseek_base_url: String,
    pub oracle_timeout_secs: u64,
}

impl Config {
    /// Load from the environment, applying defaults for absent keys.
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/yomu".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            deepseek_api_key: env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
            deepseek_base_url: env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com".to_string()),
            oracle_timeout_secs: env::var("ORACLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }
}
