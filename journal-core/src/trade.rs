//! Trade and account data structures

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl std::str::FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err(format!("Unknown trade side: {}", s)),
        }
    }
}

/// An executed, realized trade as stored and served by the journal
///
/// The tuple (broker, account_id, order_id, creation_timestamp) uniquely
/// identifies a trade; repeated sync windows that return the same execution
/// collapse onto a single row. Rows are never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Source venue tag (e.g. "projectx")
    pub broker: String,

    /// Broker account the execution belongs to
    pub account_id: i64,

    /// Instrument identifier on the broker
    pub contract_id: String,

    /// Execution timestamp as reported by the broker, immutable
    pub creation_timestamp: DateTime<Utc>,

    /// Execution price
    pub price: Decimal,

    /// Realized profit and loss; only realized trades are ever stored
    pub profit_and_loss: Decimal,

    /// Fees, stored as twice the raw broker fee (see journal-projectx)
    pub fees: Decimal,

    pub side: TradeSide,

    /// Quantity filled
    pub size: Decimal,

    /// Order identifier on the broker
    pub order_id: i64,
}

impl Trade {
    /// Canonical RFC3339 rendering of the creation timestamp
    ///
    /// Fixed-width UTC ("Z") with microsecond precision, so the stored text
    /// sorts lexicographically in chronological order and repeated fetches of
    /// the same execution always produce an identical dedup key.
    pub fn timestamp_key(&self) -> String {
        self.creation_timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// A broker account as returned by the account-search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: i64,
    pub name: String,
    pub can_trade: bool,
}
