//! Remote source abstractions
//!
//! The sync engine and the orchestrator talk to the broker through these
//! traits so tests can substitute scripted sources for the live gateway
//! client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use journal_core::{AccountInfo, JournalResult};
use journal_projectx::{ProjectXClient, TradeRecord};

/// A remote service that returns raw execution records for a time window
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// Fetch all records for an account within `[start, end)`
    ///
    /// The remote side is trusted to return the complete result set for the
    /// window in one response.
    async fn search_trades(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> JournalResult<Vec<TradeRecord>>;
}

#[async_trait]
impl TradeSource for ProjectXClient {
    async fn search_trades(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> JournalResult<Vec<TradeRecord>> {
        ProjectXClient::search_trades(self, account_id, start, end).await
    }
}

/// A remote service that lists the accounts visible to the session
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn search_accounts(&self) -> JournalResult<Vec<AccountInfo>>;
}

#[async_trait]
impl AccountSource for ProjectXClient {
    async fn search_accounts(&self) -> JournalResult<Vec<AccountInfo>> {
        ProjectXClient::search_accounts(self).await
    }
}
