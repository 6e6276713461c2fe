//! restock-import library interface
//!
//! Exposes the import engine and HTTP surface for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use restock_common::config::TomlConfig;
use restock_common::events::EventBus;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::ImportSession;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// TOML configuration (fallback tier for classifier credentials)
    pub toml_config: Arc<TomlConfig>,
    /// Import sessions for this process lifetime
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<RwLock<ImportSession>>>>>,
    /// Cancellation tokens for active import sessions
    pub cancel_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, toml_config: TomlConfig) -> Self {
        Self {
            db,
            event_bus,
            toml_config: Arc::new(toml_config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            cancel_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::import_routes())
        .route("/import/events", get(api::import_event_stream))
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .with_state(state)
}
