//! Trade ingestion and synchronization engine for the Trade Journal
//!
//! This crate provides the service layer: the durable trade store with
//! dedup-on-insert, the window sync engine, the live trade feed, session
//! refresh, and the startup orchestrator.

pub mod feed;
pub mod orchestrator;
pub mod session_manager;
pub mod source;
pub mod sync_engine;
pub mod trade_store;

pub use feed::{TradeFeed, TradeSubscription};
pub use orchestrator::{resolve_account, Orchestrator, OrchestratorConfig, StartupPhase};
pub use session_manager::{Credentials, SessionManager};
pub use source::{AccountSource, TradeSource};
pub use sync_engine::{SyncEngine, SyncReport};
pub use trade_store::{BatchOutcome, TradeStore};
