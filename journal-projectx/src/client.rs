//! ProjectX gateway API client
//!
//! Provides methods for interacting with the gateway REST API. All
//! endpoints are POST+JSON; authenticated calls carry the bearer token from
//! the shared [`Session`].

use crate::session::Session;
use crate::types::{
    AccountSearchResponse, LoginResponse, OrderRequest, OrderResult, PlaceOrderResponse,
    TradeRecord, TradeSearchResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use journal_core::{AccountInfo, JournalError};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Base URL for the ProjectX gateway API
const PROJECTX_API_BASE: &str = "https://api.topstepx.com";

/// ProjectX gateway API client
#[derive(Clone)]
pub struct ProjectXClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ProjectXClient {
    /// Create a new client against the production gateway
    pub fn new(session: Session) -> Result<Self, JournalError> {
        Self::with_base_url(PROJECTX_API_BASE, session)
    }

    /// Create a new client against a specific gateway base URL
    pub fn with_base_url(base_url: &str, session: Session) -> Result<Self, JournalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| JournalError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the shared session handle
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Helper to snapshot the current token
    fn require_token(&self) -> Result<String, JournalError> {
        self.session
            .token()
            .ok_or_else(|| JournalError::config("No active session token"))
    }

    /// Authenticate with the gateway and replace the session token
    #[instrument(skip(self, api_key))]
    pub async fn authenticate(&self, username: &str, api_key: &str) -> Result<(), JournalError> {
        if username.is_empty() || api_key.is_empty() {
            return Err(JournalError::config("Gateway credentials are not set"));
        }

        let url = format!("{}/api/Auth/loginKey", self.base_url);
        debug!("Authenticating against gateway: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "userName": username, "apiKey": api_key }))
            .send()
            .await
            .map_err(|e| JournalError::auth(format!("Login request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::auth(format!(
                "Gateway login error ({}): {}",
                status, body
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| JournalError::parse(format!("Failed to parse login response: {}", e)))?;

        match (login.success, login.token) {
            (true, Some(token)) => {
                self.session.replace(token);
                debug!("Session token replaced");
                Ok(())
            }
            _ => Err(JournalError::auth(format!(
                "Gateway rejected login: {}",
                login.error_message.unwrap_or_else(|| "unknown".to_string())
            ))),
        }
    }

    /// List active accounts (requires a session token)
    #[instrument(skip(self))]
    pub async fn search_accounts(&self) -> Result<Vec<AccountInfo>, JournalError> {
        let token = self.require_token()?;
        let url = format!("{}/api/Account/search", self.base_url);

        debug!("Fetching gateway accounts");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "onlyActiveAccounts": true }))
            .send()
            .await
            .map_err(|e| JournalError::network(format!("Failed to fetch accounts: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::api(format!(
                "Gateway API error ({}): {}",
                status, body
            )));
        }

        let accounts: AccountSearchResponse = response
            .json()
            .await
            .map_err(|e| JournalError::parse(format!("Failed to parse accounts: {}", e)))?;

        if !accounts.success {
            return Err(JournalError::api(format!(
                "Account search rejected: {}",
                accounts
                    .error_message
                    .unwrap_or_else(|| "unknown".to_string())
            )));
        }

        Ok(accounts
            .accounts
            .iter()
            .map(|a| a.to_account_info())
            .collect())
    }

    /// Search executions for an account within a half-open time window
    ///
    /// A single request per window; the gateway returns the complete result
    /// set for the range, so no pagination is involved.
    #[instrument(skip(self))]
    pub async fn search_trades(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TradeRecord>, JournalError> {
        let token = self.require_token()?;
        let url = format!("{}/api/Trade/search", self.base_url);

        debug!(
            "Fetching gateway trades for account {} in [{}, {})",
            account_id, start, end
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "accountId": account_id,
                "startTimestamp": start.to_rfc3339_opts(SecondsFormat::Micros, true),
                "endTimestamp": end.to_rfc3339_opts(SecondsFormat::Micros, true),
            }))
            .send()
            .await
            .map_err(|e| JournalError::network(format!("Failed to fetch trades: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::api(format!(
                "Gateway API error ({}): {}",
                status, body
            )));
        }

        let trades: TradeSearchResponse = response
            .json()
            .await
            .map_err(|e| JournalError::parse(format!("Failed to parse trades: {}", e)))?;

        if !trades.success {
            return Err(JournalError::api(format!(
                "Trade search rejected: {}",
                trades.error_message.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        Ok(trades.trades)
    }

    /// Place an order through the gateway (thin passthrough)
    ///
    /// The journal holds no routing logic; this exists so the caller can
    /// trigger an incremental sync right after a fill becomes possible.
    #[instrument(skip(self, request))]
    pub async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult, JournalError> {
        let token = self.require_token()?;
        let url = format!("{}/api/Order/place", self.base_url);

        debug!(
            "Placing order on account {} for {}",
            request.account_id, request.contract_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| JournalError::network(format!("Failed to place order: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::api(format!(
                "Gateway API error ({}): {}",
                status, body
            )));
        }

        let placed: PlaceOrderResponse = response
            .json()
            .await
            .map_err(|e| JournalError::parse(format!("Failed to parse order response: {}", e)))?;

        match (placed.success, placed.order_id) {
            (true, Some(order_id)) => Ok(OrderResult { order_id }),
            _ => Err(JournalError::api(format!(
                "Order rejected: {}",
                placed.error_message.unwrap_or_else(|| "unknown".to_string())
            ))),
        }
    }
}

impl std::fmt::Debug for ProjectXClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectXClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.session.is_authenticated())
            .finish()
    }
}
