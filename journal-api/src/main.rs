//! Trade Journal API Server
//!
//! HTTP/WebSocket server over the trade ingestion engine: serves the stored
//! trades, accepts administrative sync/clear requests, and streams newly
//! persisted trades to dashboard clients.

mod config;
mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use journal_projectx::{ProjectXClient, Session};
use journal_services::{
    AccountSource, Credentials, Orchestrator, OrchestratorConfig, SessionManager, SyncEngine,
    TradeFeed, TradeSource, TradeStore,
};

use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TradeStore>,
    pub feed: Arc<TradeFeed>,
    pub engine: Arc<SyncEngine>,
    pub orchestrator: Arc<Orchestrator>,
    pub client: Arc<ProjectXClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,journal_api=debug")),
        )
        .init();

    info!("Starting Trade Journal API");

    let config = Config::from_env();
    if config.username.is_none() || config.api_key.is_none() {
        info!("No gateway credentials found - syncs will fail until they are set");
    }

    // Broker client over a shared session token
    let session = Session::new();
    let client = Arc::new(ProjectXClient::with_base_url(
        &config.gateway_base_url,
        session,
    )?);

    // Durable trade store
    info!("Initializing trade store at: {}", config.db_path);
    let store = Arc::new(TradeStore::new(&config.db_path)?);

    // Live feed and sync engine
    let feed = Arc::new(TradeFeed::new());
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&client) as Arc<dyn TradeSource>,
        Arc::clone(&store),
        Arc::clone(&feed),
        "projectx",
    ));

    // Session refresh and lifecycle orchestration
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&client),
        Credentials::new(config.username.clone(), config.api_key.clone()),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        sessions,
        Arc::clone(&client) as Arc<dyn AccountSource>,
        Arc::clone(&engine),
        Arc::clone(&store),
        OrchestratorConfig {
            account_prefix: config.account_prefix.clone(),
            sync_interval: config.sync_interval,
        },
    ));

    // Clear, authenticate, backfill, then arm the steady-state timers
    orchestrator.start().await;

    // Create app state
    let state = AppState {
        store,
        feed,
        engine,
        orchestrator,
        client,
    };

    // Configure CORS for the dashboard
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Build router
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::ws_routes())
        .layer(cors)
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
