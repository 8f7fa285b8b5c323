//! Process configuration from environment variables

use std::time::Duration;

/// Server and broker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the broker gateway
    pub gateway_base_url: String,
    /// Gateway login name
    pub username: Option<String>,
    /// Gateway API key
    pub api_key: Option<String>,
    /// Case-insensitive prefix used to pick the trading account
    pub account_prefix: String,
    /// Path to the trades database file
    pub db_path: String,
    /// Interval between incremental syncs
    pub sync_interval: Duration,
    /// HTTP listen port
    pub port: u16,
}

impl Config {
    /// Build configuration from the process environment
    pub fn from_env() -> Self {
        Self {
            gateway_base_url: std::env::var("PROJECTX_BASE_URL")
                .unwrap_or_else(|_| "https://api.topstepx.com".to_string()),
            username: std::env::var("PROJECTX_USERNAME").ok(),
            api_key: std::env::var("PROJECTX_API_KEY").ok(),
            account_prefix: std::env::var("ACCOUNT_PREFIX").unwrap_or_default(),
            db_path: std::env::var("TRADES_DB_PATH")
                .unwrap_or_else(|_| "data/trades.db".to_string()),
            sync_interval: Duration::from_secs(
                std::env::var("SYNC_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
        }
    }
}
