//! ProjectX gateway API types
//!
//! These types mirror the gateway's request/response payloads and are
//! converted to journal-core types for use in the application.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use journal_core::{AccountInfo, Trade, TradeSide};

/// Response from POST /api/Auth/loginKey
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Response from POST /api/Account/search
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSearchResponse {
    #[serde(default)]
    pub accounts: Vec<AccountRecord>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A broker account from the API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub can_trade: bool,
}

impl AccountRecord {
    pub fn to_account_info(&self) -> AccountInfo {
        AccountInfo {
            id: self.id,
            name: self.name.clone(),
            can_trade: self.can_trade,
        }
    }
}

/// Response from POST /api/Trade/search
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSearchResponse {
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A raw execution record from the gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    /// Gateway order identifier
    pub id: i64,

    pub account_id: i64,

    pub contract_id: String,

    pub creation_timestamp: DateTime<Utc>,

    pub price: Decimal,

    /// Null until the position closes; unrealized executions are excluded
    /// from persistence entirely.
    #[serde(default)]
    pub profit_and_loss: Option<Decimal>,

    pub fees: Decimal,

    /// Raw side code. The gateway reports the side of the resting order
    /// being filled, not the taker side.
    pub side: i32,

    pub size: Decimal,

    #[serde(default)]
    pub voided: bool,
}

impl TradeRecord {
    /// Convert to the stored trade shape, or `None` for unrealized records
    ///
    /// Two raw fields are deliberately transformed and must not be "fixed":
    /// the numeric side code is inverted (`side == 1` maps to buy, anything
    /// else to sell) because the gateway records the resting side, and the
    /// fee is doubled to cover both legs of the round trip. Both are
    /// replicated verbatim from the upstream contract.
    pub fn into_trade(self, broker: &str) -> Option<Trade> {
        let profit_and_loss = self.profit_and_loss?;

        let side = if self.side == 1 {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };

        Some(Trade {
            broker: broker.to_string(),
            account_id: self.account_id,
            contract_id: self.contract_id,
            creation_timestamp: self.creation_timestamp,
            price: self.price,
            profit_and_loss,
            fees: self.fees * Decimal::TWO,
            side,
            size: self.size,
            order_id: self.id,
        })
    }
}

/// Request body for POST /api/Order/place
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub account_id: i64,
    pub contract_id: String,
    /// Gateway order type code (e.g. 2 = market)
    #[serde(rename = "type")]
    pub order_type: i32,
    /// Gateway side code (0 = buy, 1 = sell)
    pub side: i32,
    pub size: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
}

/// Response from POST /api/Order/place
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    #[serde(default)]
    pub order_id: Option<i64>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Result of a successful order placement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: i64,
}
