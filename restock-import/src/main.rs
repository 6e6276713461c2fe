//! restock-import - Marketplace Catalog Import Service
//!
//! Ingests marketplace CSV exports and reconciles them against the product
//! catalog: duplicate detection, category classification (keyword scoring
//! with optional remote zero-shot AI), taxonomy path resolution, and
//! incremental image-set syncing - streaming progress to callers over SSE.

use anyhow::Result;
use restock_common::events::EventBus;
use tracing::info;
use tracing_subscriber::EnvFilter;

use restock_import::AppState;

const LISTEN_ADDR: &str = "127.0.0.1:5743";

#[tokio::main]
async fn main() -> Result<()> {
    // Step 1: load TOML config (also the logging level default)
    let config_path = restock_common::config::default_config_path();
    let toml_config = match &config_path {
        Some(path) => restock_common::config::load_toml_config(path)?,
        None => Default::default(),
    };

    // Initialize tracing, RESTOCK_LOG overriding the configured level
    let filter = EnvFilter::try_from_env("RESTOCK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting restock-import (Marketplace Catalog Import)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 2: resolve and create the root data folder
    let root_folder =
        restock_common::config::resolve_root_folder(None, "RESTOCK_ROOT", &toml_config);
    let db_path = restock_common::config::ensure_root_folder(&root_folder)?;
    info!("Database: {}", db_path.display());

    // Step 3: open or create the database
    let db_pool = restock_import::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(1024);

    let state = AppState::new(db_pool, event_bus, toml_config);
    let app = restock_import::build_router(state);

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    info!("Listening on http://{}", LISTEN_ADDR);
    info!("Health check: http://{}/health", LISTEN_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
