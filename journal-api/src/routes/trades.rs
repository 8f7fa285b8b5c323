//! Trade store and sync endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::AppState;
use journal_core::{JournalError, Trade};
use journal_services::SyncReport;

/// Response for listing trades
#[derive(Debug, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<Trade>,
    pub count: usize,
}

/// Response for the administrative clear
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// Request for a manual window sync
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Account to sync; defaults to the resolved trading account
    pub account_id: Option<i64>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create trade routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trades", get(list_trades))
        .route("/trades/clear", post(clear_trades))
        .route("/sync", post(sync_window))
}

/// List all stored trades, newest first
async fn list_trades(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_all() {
        Ok(trades) => {
            let count = trades.len();
            (StatusCode::OK, Json(TradesResponse { trades, count })).into_response()
        }
        Err(e) => {
            error!("Failed to list trades: {}", e);
            error_response(&e)
        }
    }
}

/// Delete every stored trade
async fn clear_trades(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.clear_all() {
        Ok(cleared) => {
            info!("Cleared {} trades on request", cleared);
            (StatusCode::OK, Json(ClearResponse { cleared })).into_response()
        }
        Err(e) => {
            error!("Failed to clear trades: {}", e);
            error_response(&e)
        }
    }
}

/// Run one window sync on demand
async fn sync_window(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> impl IntoResponse {
    let account_id = match request.account_id.or(state.orchestrator.account_id()) {
        Some(id) => id,
        None => {
            return error_response(&JournalError::config("No tradable account resolved"));
        }
    };

    match state
        .engine
        .sync_window(account_id, request.start, request.end)
        .await
    {
        Ok(report) => (StatusCode::OK, Json::<SyncReport>(report)).into_response(),
        Err(e) => {
            error!("Manual sync failed: {}", e);
            error_response(&e)
        }
    }
}

/// Map engine errors onto status codes with a JSON error payload
pub fn error_response(error: &JournalError) -> axum::response::Response {
    let status = match error {
        JournalError::Config(_) => StatusCode::PRECONDITION_FAILED,
        JournalError::Auth(_) => StatusCode::UNAUTHORIZED,
        JournalError::Network(_) | JournalError::Api(_) | JournalError::Sync(_) => {
            StatusCode::BAD_GATEWAY
        }
        JournalError::Parse(_) | JournalError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}
