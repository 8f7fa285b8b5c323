//! Order placement passthrough
//!
//! The journal holds no routing logic; this endpoint forwards the order to
//! the gateway and immediately fires an incremental sync so the resulting
//! fill shows up on the dashboard without waiting for the next timer tick.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::AppState;
use journal_core::JournalError;
use journal_projectx::OrderRequest;

use super::trades::error_response;

/// Request to place an order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderBody {
    pub contract_id: String,
    /// Gateway order type code (e.g. 2 = market)
    #[serde(rename = "type")]
    pub order_type: i32,
    /// Gateway side code (0 = buy, 1 = sell)
    pub side: i32,
    pub size: i32,
    pub limit_price: Option<Decimal>,
}

/// Response from order placement
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub order_id: i64,
}

/// Create order routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/orders", post(place_order))
}

/// Place an order and trigger the post-order sync
async fn place_order(
    State(state): State<AppState>,
    Json(body): Json<PlaceOrderBody>,
) -> impl IntoResponse {
    let account_id = match state.orchestrator.account_id() {
        Some(id) => id,
        None => {
            return error_response(&JournalError::config("No tradable account resolved"));
        }
    };

    let request = OrderRequest {
        account_id,
        contract_id: body.contract_id,
        order_type: body.order_type,
        side: body.side,
        size: body.size,
        limit_price: body.limit_price,
    };

    match state.client.place_order(&request).await {
        Ok(result) => {
            info!("Order {} placed, syncing recent fills", result.order_id);

            // Best effort: the recurring timer covers anything this misses.
            if let Err(e) = state.orchestrator.sync_after_order().await {
                warn!("Post-order sync failed: {}", e);
            }

            (
                StatusCode::OK,
                Json(PlaceOrderResponse {
                    success: true,
                    order_id: result.order_id,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Order placement failed: {}", e);
            error_response(&e)
        }
    }
}
