//! Session refresh service
//!
//! Owns the broker credentials and keeps the shared session token fresh on
//! a fixed schedule. Refresh failures are logged, never fatal: the previous
//! token stays in place and the next cycle (or a manual trigger) retries.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use journal_core::{JournalError, JournalResult};
use journal_projectx::{ProjectXClient, Session};

/// Default interval between token refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Broker login credentials from configuration
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub api_key: Option<String>,
}

impl Credentials {
    pub fn new(username: Option<String>, api_key: Option<String>) -> Self {
        Self { username, api_key }
    }

    fn require(&self) -> JournalResult<(&str, &str)> {
        match (self.username.as_deref(), self.api_key.as_deref()) {
            (Some(u), Some(k)) if !u.is_empty() && !k.is_empty() => Ok((u, k)),
            _ => Err(JournalError::config(
                "Broker credentials are not configured",
            )),
        }
    }
}

/// Keeps the session token current
pub struct SessionManager {
    client: Arc<ProjectXClient>,
    credentials: Credentials,
    refresh_interval: Duration,
}

impl SessionManager {
    pub fn new(client: Arc<ProjectXClient>, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }

    /// Acquire (or re-acquire) a session token now
    ///
    /// Missing credentials are a configuration error, not a retry case.
    pub async fn authenticate(&self) -> JournalResult<()> {
        let (username, api_key) = self.credentials.require()?;
        self.client.authenticate(username, api_key).await?;
        info!("Session token acquired");
        Ok(())
    }

    /// Run the scheduled refresh loop forever
    ///
    /// The first tick is consumed immediately so startup authentication is
    /// not repeated; each subsequent tick re-authenticates and logs any
    /// failure without touching the existing token.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut ticker = interval(self.refresh_interval);
        ticker.tick().await;

        info!(
            "Session refresh armed, interval {}s",
            self.refresh_interval.as_secs()
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.authenticate().await {
                warn!("Scheduled session refresh failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("refresh_interval", &self.refresh_interval)
            .field("authenticated", &self.session().is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let creds = Credentials::default();
        assert!(matches!(creds.require(), Err(JournalError::Config(_))));

        let half = Credentials::new(Some("user".to_string()), None);
        assert!(matches!(half.require(), Err(JournalError::Config(_))));

        let empty = Credentials::new(Some("user".to_string()), Some(String::new()));
        assert!(matches!(empty.require(), Err(JournalError::Config(_))));

        let full = Credentials::new(Some("user".to_string()), Some("key".to_string()));
        assert_eq!(full.require().unwrap(), ("user", "key"));
    }
}
