//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::AppState;
use journal_services::StartupPhase;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    phase: StartupPhase,
    trades: usize,
    subscribers: usize,
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let phase = state.orchestrator.phase();
    let trades = state.store.count().unwrap_or(0);

    let status = if phase == StartupPhase::SteadyState {
        "healthy"
    } else {
        "starting"
    };

    let response = HealthResponse {
        status: status.to_string(),
        phase,
        trades,
        subscribers: state.feed.subscriber_count(),
    };

    (StatusCode::OK, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "ok"
}
