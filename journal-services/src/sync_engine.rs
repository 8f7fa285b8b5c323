//! Sync Engine
//!
//! Orchestrates one bounded-time-range fetch against the remote trade
//! search, feeds the records through dedup-and-persist, and publishes the
//! newly written trades to the live feed after the transaction commits.
//!
//! Retrying any window is always safe: overlapping backfill and incremental
//! windows are expected and collapse in the store's primary key. Concurrent
//! window syncs are tolerated for the same reason; nothing here serializes
//! them.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use journal_core::{JournalError, JournalResult};

use crate::feed::TradeFeed;
use crate::source::TradeSource;
use crate::trade_store::TradeStore;

/// Width of the steady-state incremental window, in seconds
const INCREMENTAL_WINDOW_SECS: i64 = 60;

/// Counts reported by one window sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SyncReport {
    /// Rows written by this invocation
    pub inserted: usize,
    /// Realized records that already existed
    pub skipped: usize,
}

/// Window-sync orchestration over a remote trade source
pub struct SyncEngine {
    source: Arc<dyn TradeSource>,
    store: Arc<TradeStore>,
    feed: Arc<TradeFeed>,
    broker: String,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn TradeSource>,
        store: Arc<TradeStore>,
        feed: Arc<TradeFeed>,
        broker: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            feed,
            broker: broker.into(),
        }
    }

    /// Sync one half-open window `[start, end)` for an account
    ///
    /// On a fetch failure the whole window fails with zero inserts; records
    /// with null P&L (and voided records) are excluded from both counters,
    /// so `inserted + skipped` always equals the number of realized records
    /// the remote returned.
    #[instrument(skip(self))]
    pub async fn sync_window(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> JournalResult<SyncReport> {
        let records = match self.source.search_trades(account_id, start, end).await {
            Ok(records) => records,
            // Missing credentials/token keeps its shape so callers do not
            // blindly retry it; everything else is a failed window.
            Err(e @ JournalError::Config(_)) => return Err(e),
            Err(e) => return Err(JournalError::sync(format!("Window fetch failed: {}", e))),
        };

        debug!(
            "Window [{}, {}) returned {} records for account {}",
            start,
            end,
            records.len(),
            account_id
        );

        let trades: Vec<_> = records
            .into_iter()
            .filter(|r| !r.voided)
            .filter_map(|r| r.into_trade(&self.broker))
            .collect();

        let outcome = self.store.persist_batch(&trades)?;

        for trade in &outcome.inserted {
            self.feed.publish(trade);
        }

        let report = SyncReport {
            inserted: outcome.inserted.len(),
            skipped: outcome.skipped,
        };

        info!(
            "Synced account {}: {} inserted, {} skipped",
            account_id, report.inserted, report.skipped
        );

        Ok(report)
    }

    /// One-time wide sync covering the current calendar month to date
    #[instrument(skip(self))]
    pub async fn backfill(&self, account_id: i64) -> JournalResult<SyncReport> {
        let now = Utc::now();
        let month_start = start_of_month(now);
        info!(
            "Backfilling account {} from {} to now",
            account_id, month_start
        );
        self.sync_window(account_id, month_start, now).await
    }

    /// Narrow sync covering roughly the last minute
    ///
    /// Used by the recurring timer and the post-order trigger; overlap with
    /// previous windows is expected and absorbed by dedup.
    #[instrument(skip(self))]
    pub async fn sync_recent(&self, account_id: i64) -> JournalResult<SyncReport> {
        let end = Utc::now();
        let start = end - Duration::seconds(INCREMENTAL_WINDOW_SECS);
        self.sync_window(account_id, start, end).await
    }
}

/// First instant of the month containing `now`
fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("broker", &self.broker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use journal_projectx::TradeRecord;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    /// A scripted trade source returning a fixed record set
    struct FixedSource {
        records: Mutex<Vec<TradeRecord>>,
    }

    impl FixedSource {
        fn new(records: Vec<TradeRecord>) -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(records),
            })
        }
    }

    #[async_trait]
    impl TradeSource for FixedSource {
        async fn search_trades(
            &self,
            _account_id: i64,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> JournalResult<Vec<TradeRecord>> {
            Ok(self.records.lock().clone())
        }
    }

    /// A source that always fails the remote call
    struct FailingSource(JournalError);

    #[async_trait]
    impl TradeSource for FailingSource {
        async fn search_trades(
            &self,
            _account_id: i64,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> JournalResult<Vec<TradeRecord>> {
            Err(match &self.0 {
                JournalError::Config(m) => JournalError::config(m.clone()),
                JournalError::Network(m) => JournalError::network(m.clone()),
                e => JournalError::api(e.to_string()),
            })
        }
    }

    fn record(id: i64, pnl: Option<rust_decimal::Decimal>, second: u32) -> TradeRecord {
        TradeRecord {
            id,
            account_id: 77,
            contract_id: "CON.F.US.ENQ.H25".to_string(),
            creation_timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, second).unwrap(),
            price: dec!(18250.25),
            profit_and_loss: pnl,
            fees: dec!(2.50),
            side: 1,
            size: dec!(1),
            voided: false,
        }
    }

    fn engine(source: Arc<dyn TradeSource>) -> (SyncEngine, Arc<TradeStore>, Arc<TradeFeed>) {
        let store = Arc::new(TradeStore::new_in_memory().unwrap());
        let feed = Arc::new(TradeFeed::new());
        let engine = SyncEngine::new(source, Arc::clone(&store), Arc::clone(&feed), "projectx");
        (engine, store, feed)
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_identical_window_is_idempotent() {
        let source = FixedSource::new(vec![
            record(1, Some(dec!(10)), 0),
            record(2, Some(dec!(-4)), 1),
        ]);
        let (engine, store, _feed) = engine(source);
        let (start, end) = window();

        let first = engine.sync_window(77, start, end).await.unwrap();
        assert_eq!(first, SyncReport { inserted: 2, skipped: 0 });

        let second = engine.sync_window(77, start, end).await.unwrap();
        assert_eq!(second, SyncReport { inserted: 0, skipped: 2 });

        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_null_pnl_records_are_invisible() {
        let source = FixedSource::new(vec![
            record(1, Some(dec!(10)), 0),
            record(2, None, 1),
            record(3, None, 2),
        ]);
        let (engine, store, feed) = engine(source);
        let mut sub = feed.subscribe();
        let (start, end) = window();

        let report = engine.sync_window(77, start, end).await.unwrap();

        // Unrealized records are neither inserted nor counted as skipped.
        assert_eq!(report, SyncReport { inserted: 1, skipped: 0 });
        assert_eq!(store.count().unwrap(), 1);

        // And never broadcast.
        assert_eq!(sub.recv().await.unwrap().order_id, 1);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_voided_records_are_excluded() {
        let mut voided = record(2, Some(dec!(3)), 1);
        voided.voided = true;
        let source = FixedSource::new(vec![record(1, Some(dec!(10)), 0), voided]);
        let (engine, store, _feed) = engine(source);
        let (start, end) = window();

        let report = engine.sync_window(77, start, end).await.unwrap();
        assert_eq!(report, SyncReport { inserted: 1, skipped: 0 });
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_inserts_nothing() {
        let source = Arc::new(FailingSource(JournalError::network("connection reset")));
        let (engine, store, _feed) = engine(source);
        let (start, end) = window();

        let err = engine.sync_window(77, start, end).await.unwrap_err();
        assert!(matches!(err, JournalError::Sync(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_token_keeps_config_shape() {
        let source = Arc::new(FailingSource(JournalError::config(
            "No active session token",
        )));
        let (engine, store, _feed) = engine(source);
        let (start, end) = window();

        let err = engine.sync_window(77, start, end).await.unwrap_err();
        assert!(matches!(err, JournalError::Config(_)));
        assert!(err.to_string().contains("session token"));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inserted_trades_are_published_in_order() {
        let source = FixedSource::new(vec![
            record(1, Some(dec!(10)), 0),
            record(2, Some(dec!(20)), 1),
        ]);
        let (engine, _store, feed) = engine(source);
        let mut sub = feed.subscribe();
        let (start, end) = window();

        engine.sync_window(77, start, end).await.unwrap();

        assert_eq!(sub.recv().await.unwrap().order_id, 1);
        assert_eq!(sub.recv().await.unwrap().order_id, 2);
    }

    #[test]
    fn test_start_of_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }
}
