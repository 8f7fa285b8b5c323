//! WebSocket route handler
//!
//! Streams newly persisted trades to dashboard clients. Clients receive no
//! backlog: they pull current state from GET /api/trades on connect and get
//! `trade_update` frames from then on.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::AppState;
use journal_core::{ClientMessage, ServerMessage};

/// Create WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut subscription = state.feed.subscribe();
    let client_id = subscription.id();
    info!("New WebSocket connection: {}", client_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // All outgoing frames funnel through one channel so the feed forwarder
    // and the ping handler never contend for the sink.
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<ServerMessage>(100);
    let feed_tx = outgoing_tx.clone();

    // Task: forward published trades to this client
    let feed_task = tokio::spawn(async move {
        while let Some(trade) = subscription.recv().await {
            if feed_tx.send(ServerMessage::TradeUpdate { trade }).await.is_err() {
                break;
            }
        }
    });

    // Task: serialize and send outgoing messages
    let send_task = tokio::spawn(async move {
        while let Some(message) = outgoing_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };

            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop: pings and close frames
    let recv_task = async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping { timestamp }) => {
                        let _ = outgoing_tx
                            .send(ServerMessage::Pong {
                                client_timestamp: timestamp,
                                server_timestamp: Utc::now().timestamp_millis(),
                            })
                            .await;
                    }
                    Err(e) => {
                        warn!("Invalid message from {}: {}", client_id, e);
                        let _ = outgoing_tx
                            .send(ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            })
                            .await;
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Received close from {}", client_id);
                    break;
                }
                Ok(_) => {
                    // Ping/pong frames are handled by axum; binary is ignored
                }
                Err(e) => {
                    debug!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
    };

    // Wait for either side to finish (connection closed)
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    feed_task.abort();
    info!("WebSocket connection closed: {}", client_id);
}
