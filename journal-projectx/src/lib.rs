//! ProjectX gateway integration for the Trade Journal
//!
//! This crate provides a client for the ProjectX-style broker REST API:
//! session authentication, account search, trade search, and a thin order
//! passthrough. Raw API records are converted to journal-core types here.

pub mod client;
pub mod session;
pub mod types;

pub use client::ProjectXClient;
pub use session::Session;
pub use types::{AccountRecord, OrderRequest, OrderResult, TradeRecord};
