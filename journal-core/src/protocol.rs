//! WebSocket message types for the live trade feed
//!
//! These types define the protocol between the server and dashboard
//! clients. The feed carries no backlog: clients pull current state over
//! HTTP on connect and receive only trades persisted afterwards.

use serde::{Deserialize, Serialize};

use crate::Trade;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping to keep connection alive
    Ping {
        /// Client timestamp
        timestamp: i64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A newly persisted trade
    TradeUpdate { trade: Trade },
    /// Pong response to client ping
    Pong {
        /// Echo back client timestamp
        client_timestamp: i64,
        /// Server timestamp
        server_timestamp: i64,
    },
    /// Error message
    Error { message: String },
}
