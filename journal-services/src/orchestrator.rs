//! Startup orchestrator
//!
//! Drives the process through its startup phases and arms the steady-state
//! timers. Transitions are strictly forward and there is no terminal error
//! state: a failed step is logged and the process still ends up live, with
//! individual sync calls failing (and being retried by the next trigger)
//! until the operator fixes the underlying problem.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use journal_core::{AccountInfo, JournalError, JournalResult};

use crate::session_manager::SessionManager;
use crate::source::AccountSource;
use crate::sync_engine::{SyncEngine, SyncReport};
use crate::trade_store::TradeStore;

/// Startup phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPhase {
    Idle,
    TokenAcquired,
    AccountResolved,
    BackfillDone,
    SteadyState,
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Case-insensitive prefix used to pick the trading account
    pub account_prefix: String,
    /// Interval between incremental syncs
    pub sync_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            account_prefix: String::new(),
            sync_interval: Duration::from_secs(60),
        }
    }
}

/// Process lifecycle driver
pub struct Orchestrator {
    sessions: Arc<SessionManager>,
    accounts: Arc<dyn AccountSource>,
    engine: Arc<SyncEngine>,
    store: Arc<TradeStore>,
    config: OrchestratorConfig,
    phase: RwLock<StartupPhase>,
    account_id: RwLock<Option<i64>>,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionManager>,
        accounts: Arc<dyn AccountSource>,
        engine: Arc<SyncEngine>,
        store: Arc<TradeStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            sessions,
            accounts,
            engine,
            store,
            config,
            phase: RwLock::new(StartupPhase::Idle),
            account_id: RwLock::new(None),
        }
    }

    pub fn phase(&self) -> StartupPhase {
        *self.phase.read()
    }

    /// The resolved trading account, if any
    pub fn account_id(&self) -> Option<i64> {
        *self.account_id.read()
    }

    fn advance(&self, phase: StartupPhase) {
        *self.phase.write() = phase;
        info!("Startup phase: {:?}", phase);
    }

    /// Run the startup sequence and arm the steady-state timers
    ///
    /// Each step logs its failure and proceeds; steady state is only
    /// entered after the backfill has been attempted.
    pub async fn start(self: &Arc<Self>) {
        // History from earlier runs is discarded; the backfill re-derives
        // the current month's view.
        match self.store.clear_all() {
            Ok(cleared) => info!("Cleared {} rows from a previous run", cleared),
            Err(e) => error!("Failed to clear trade store at startup: {}", e),
        }

        if let Err(e) = self.sessions.authenticate().await {
            error!("Startup authentication failed: {}", e);
        }
        self.advance(StartupPhase::TokenAcquired);

        match self.accounts.search_accounts().await {
            Ok(accounts) => {
                match resolve_account(&accounts, &self.config.account_prefix) {
                    Some(id) => {
                        *self.account_id.write() = Some(id);
                        info!("Resolved trading account {}", id);
                    }
                    None => warn!(
                        "No tradable account matches prefix {:?}",
                        self.config.account_prefix
                    ),
                }
            }
            Err(e) => error!("Account resolution failed: {}", e),
        }
        self.advance(StartupPhase::AccountResolved);

        // Backfill is attempted exactly once; a failure leaves the process
        // degraded but live.
        match self.account_id() {
            Some(id) => match self.engine.backfill(id).await {
                Ok(report) => info!(
                    "Backfill complete: {} inserted, {} skipped",
                    report.inserted, report.skipped
                ),
                Err(e) => error!("Backfill failed: {}", e),
            },
            None => warn!("Skipping backfill, no account resolved"),
        }
        self.advance(StartupPhase::BackfillDone);

        self.arm_steady_state();
        self.advance(StartupPhase::SteadyState);
    }

    fn arm_steady_state(self: &Arc<Self>) {
        tokio::spawn(Arc::clone(&self.sessions).run_refresh_loop());

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(orchestrator.config.sync_interval);
            ticker.tick().await;

            info!(
                "Incremental sync armed, interval {}s",
                orchestrator.config.sync_interval.as_secs()
            );

            loop {
                ticker.tick().await;
                let Some(id) = orchestrator.account_id() else {
                    warn!("Incremental sync skipped, no account resolved");
                    continue;
                };
                if let Err(e) = orchestrator.engine.sync_recent(id).await {
                    warn!("Incremental sync failed: {}", e);
                }
            }
        });
    }

    /// Immediate incremental sync, fired right after an order placement
    pub async fn sync_after_order(&self) -> JournalResult<SyncReport> {
        let id = self
            .account_id()
            .ok_or_else(|| JournalError::config("No tradable account resolved"))?;
        self.engine.sync_recent(id).await
    }
}

/// Pick the trading account: first entry whose name starts with the prefix
/// (case-insensitive) and which is flagged tradable
pub fn resolve_account(accounts: &[AccountInfo], prefix: &str) -> Option<i64> {
    let prefix = prefix.to_lowercase();
    accounts
        .iter()
        .find(|a| a.can_trade && a.name.to_lowercase().starts_with(&prefix))
        .map(|a| a.id)
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("phase", &self.phase())
            .field("account_id", &self.account_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use journal_core::{Trade, TradeSide};
    use journal_projectx::{ProjectXClient, Session, TradeRecord};
    use rust_decimal_macros::dec;

    use crate::feed::TradeFeed;
    use crate::session_manager::Credentials;
    use crate::source::TradeSource;

    fn account(id: i64, name: &str, can_trade: bool) -> AccountInfo {
        AccountInfo {
            id,
            name: name.to_string(),
            can_trade,
        }
    }

    /// Scripted account listing; `None` fails the lookup outright
    struct StubAccounts(Option<Vec<AccountInfo>>);

    #[async_trait]
    impl AccountSource for StubAccounts {
        async fn search_accounts(&self) -> JournalResult<Vec<AccountInfo>> {
            match &self.0 {
                Some(accounts) => Ok(accounts.clone()),
                None => Err(JournalError::api("account search unavailable")),
            }
        }
    }

    /// A source whose every window contains one realized trade
    struct OneTradeSource;

    #[async_trait]
    impl TradeSource for OneTradeSource {
        async fn search_trades(
            &self,
            _account_id: i64,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> JournalResult<Vec<TradeRecord>> {
            Ok(vec![TradeRecord {
                id: 501,
                account_id: 77,
                contract_id: "CON.F.US.ENQ.H25".to_string(),
                creation_timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, 0).unwrap(),
                price: dec!(18250.25),
                profit_and_loss: Some(dec!(12.5)),
                fees: dec!(2.50),
                side: 1,
                size: dec!(1),
                voided: false,
            }])
        }
    }

    fn stale_trade() -> Trade {
        Trade {
            broker: "projectx".to_string(),
            account_id: 77,
            contract_id: "CON.F.US.ENQ.H25".to_string(),
            creation_timestamp: Utc.with_ymd_and_hms(2025, 2, 27, 9, 0, 0).unwrap(),
            price: dec!(100),
            profit_and_loss: dec!(1),
            fees: dec!(2),
            side: TradeSide::Sell,
            size: dec!(1),
            order_id: 42,
        }
    }

    /// Full wiring with scripted remotes and unset credentials, so the
    /// authentication step fails fast without touching the network.
    fn orchestrator(accounts: StubAccounts, store: Arc<TradeStore>) -> Arc<Orchestrator> {
        let feed = Arc::new(TradeFeed::new());
        let engine = Arc::new(SyncEngine::new(
            Arc::new(OneTradeSource),
            Arc::clone(&store),
            feed,
            "projectx",
        ));
        let client = Arc::new(ProjectXClient::new(Session::new()).unwrap());
        let sessions = Arc::new(SessionManager::new(client, Credentials::default()));

        Arc::new(Orchestrator::new(
            sessions,
            Arc::new(accounts),
            engine,
            store,
            OrchestratorConfig {
                account_prefix: "PRAC".to_string(),
                sync_interval: Duration::from_secs(3600),
            },
        ))
    }

    #[test]
    fn test_resolution_prefers_first_tradable_prefix_match() {
        let accounts = vec![
            account(1, "EVAL-1201", false),
            account(2, "PRAC-8844", true),
            account(3, "PRAC-9001", true),
        ];

        assert_eq!(resolve_account(&accounts, "prac"), Some(2));
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let accounts = vec![account(5, "Prac-100", true)];
        assert_eq!(resolve_account(&accounts, "PRAC"), Some(5));
    }

    #[test]
    fn test_untradable_accounts_never_match() {
        let accounts = vec![account(1, "PRAC-1", false)];
        assert_eq!(resolve_account(&accounts, "PRAC"), None);
    }

    #[test]
    fn test_no_match_leaves_account_unset() {
        let accounts = vec![account(1, "EVAL-1", true)];
        assert_eq!(resolve_account(&accounts, "PRAC"), None);
        assert_eq!(resolve_account(&[], "PRAC"), None);
    }

    #[tokio::test]
    async fn test_start_clears_old_rows_and_reaches_steady_state() {
        let store = Arc::new(TradeStore::new_in_memory().unwrap());
        store.persist(&stale_trade()).unwrap();

        let orchestrator = orchestrator(
            StubAccounts(Some(vec![account(77, "PRAC-8844", true)])),
            Arc::clone(&store),
        );
        assert_eq!(orchestrator.phase(), StartupPhase::Idle);

        orchestrator.start().await;

        assert_eq!(orchestrator.phase(), StartupPhase::SteadyState);
        assert_eq!(orchestrator.account_id(), Some(77));

        // The previous run's row is gone; only the backfilled trade remains.
        let order_ids: Vec<i64> = store
            .list_all()
            .unwrap()
            .iter()
            .map(|t| t.order_id)
            .collect();
        assert_eq!(order_ids, vec![501]);
    }

    #[tokio::test]
    async fn test_start_survives_account_resolution_failure() {
        let store = Arc::new(TradeStore::new_in_memory().unwrap());
        store.persist(&stale_trade()).unwrap();

        let orchestrator = orchestrator(StubAccounts(None), Arc::clone(&store));
        orchestrator.start().await;

        // Degraded but live: the store was still cleared, no account was
        // resolved, and the backfill had nothing to run against.
        assert_eq!(orchestrator.phase(), StartupPhase::SteadyState);
        assert_eq!(orchestrator.account_id(), None);
        assert_eq!(store.count().unwrap(), 0);
    }
}
