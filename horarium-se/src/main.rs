//! horarium-se - Schedule Extraction microservice
//!
//! Discovers and extracts parish service schedules from third-party web
//! sources, validates them, and maintains the immutable extraction/diff
//! audit trail. Exposes the write/intake API (user reports, out-of-cycle
//! extraction triggers) and an SSE progress stream.
//!
//! Port: 5741

use anyhow::Result;
use horarium_common::config::{RootFolderInitializer, RootFolderResolver};
use horarium_common::events::EventBus;
use horarium_se::config::ExtractionConfig;
use horarium_se::orchestrator::{batch_loop, trigger_worker, Orchestrator};
use horarium_se::AppState;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any database delays
    info!(
        "Starting Horarium Schedule Extraction (horarium-se) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let resolver = RootFolderResolver::new("schedule-extraction");
    let root_folder = resolver.resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db = horarium_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    let toml_config = horarium_common::config::load_toml_config()?;
    let extraction_config = ExtractionConfig::load(&db, &toml_config).await?;
    info!(
        tier1_threshold = extraction_config.tier1_threshold,
        tier2_threshold = extraction_config.tier2_threshold,
        tier3_threshold = extraction_config.tier3_threshold,
        worker_pool = extraction_config.worker_pool_size,
        "Extraction configuration resolved"
    );

    let event_bus = EventBus::new(100);

    let (trigger_tx, trigger_rx) = tokio::sync::mpsc::channel(64);
    let state = AppState::new(db.clone(), event_bus.clone(), trigger_tx);

    let orchestrator = Arc::new(Orchestrator::new(
        db,
        event_bus,
        extraction_config,
        Arc::clone(&state.in_flight),
    )?);

    // Background workers: scheduled batches and the trigger queue
    tokio::spawn(batch_loop(Arc::clone(&orchestrator)));
    tokio::spawn(trigger_worker(orchestrator, trigger_rx));

    let app = horarium_se::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5741").await?;
    info!("Listening on http://127.0.0.1:5741");
    info!("Health check: http://127.0.0.1:5741/health");

    axum::serve(listener, app).await?;

    Ok(())
}
