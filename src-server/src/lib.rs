//! EURL Books Backend
//!
//! Layered architecture:
//! - domain: Ledger entities, sync snapshot and mutation commands
//! - repository: SQLite data access
//! - storage: Receipt files
//! - ocr: Receipt analysis
//! - commands: HTTP handlers

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;

pub mod domain;
pub mod repository;
pub mod storage;
pub mod ocr;
pub mod config;
mod commands;

pub use commands::{ApiError, AUTH_COOKIE, AUTH_COOKIE_VALUE};
pub use config::ServerConfig;

use ocr::{GeminiBackend, OcrBackend};
use repository::{init_db, LedgerRepository, MutationRepository, MutationSink, SnapshotSource};
use storage::{ReceiptStore, FILES_ROUTE};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub snapshots: Arc<dyn SnapshotSource>,
    pub mutations: Arc<dyn MutationSink>,
    pub receipts: ReceiptStore,
    /// `None` when no API key is configured
    pub ocr: Option<Arc<dyn OcrBackend>>,
}

impl AppState {
    /// Wire the SQLite repositories, receipt directory and Gemini backend
    pub async fn from_config(config: ServerConfig) -> Result<Self, String> {
        let db_state = init_db(&config.db_path).await?;
        let conn = db_state.connection();

        let ocr = config
            .gemini_api_key
            .as_deref()
            .map(|key| Arc::new(GeminiBackend::new(key)) as Arc<dyn OcrBackend>);
        if ocr.is_none() {
            log::warn!("GEMINI_API_KEY is not set, /ocr will answer 500");
        }
        if config.pin_code.is_none() {
            log::warn!("APP_PIN_CODE is not set, /auth will answer 500");
        }

        Ok(Self {
            receipts: ReceiptStore::new(config.receipts_dir.clone()),
            snapshots: Arc::new(LedgerRepository::new(conn.clone())),
            mutations: Arc::new(MutationRepository::new(conn)),
            config: Arc::new(config),
            ocr,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(commands::login_page))
        .route("/auth", post(commands::authenticate))
        .route("/db/sync", get(commands::sync))
        .route("/db/mutate", post(commands::mutate))
        .route("/upload", post(commands::upload))
        .route(FILES_ROUTE, get(commands::get_file))
        .route("/delete", post(commands::delete_file))
        .route("/ocr", post(commands::analyze))
        .fallback(|| async { ApiError::NotFound("Not found".to_string()) })
        .layer(from_fn(commands::auth_gate))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}

/// Start the HTTP server
pub async fn run(config: ServerConfig) -> Result<(), String> {
    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", bind_addr, e))?;
    log::info!("Listening on {}", bind_addr);

    serve(listener, state, shutdown_signal()).await
}

/// Serve the router on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: tokio::net::TcpListener, state: AppState, shutdown: F) -> Result<(), String>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
