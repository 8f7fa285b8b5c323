//! Core types for the Trade Journal
//!
//! This crate defines the shared data structures used across the journal,
//! including the stored trade shape, account metadata, and the live-feed
//! message protocol.

pub mod error;
pub mod protocol;
pub mod trade;

pub use error::{JournalError, JournalResult};
pub use protocol::{ClientMessage, ServerMessage};
pub use trade::{AccountInfo, Trade, TradeSide};
