//! horarium-qs - Query Service microservice
//!
//! Serves the read queries over the extraction store: proximity search,
//! next occurrences and the admin audit feed.
//!
//! Port: 5742

use anyhow::Result;
use horarium_common::config::{RootFolderInitializer, RootFolderResolver};
use horarium_qs::{build_router, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Horarium Query Service (horarium-qs) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let resolver = RootFolderResolver::new("query-service");
    let root_folder = resolver.resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    // Read-only: this service must never mutate the audit trail
    let pool = match horarium_common::db::connect_readonly(&db_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!(
                "Failed to connect to database (has horarium-se initialized it?): {}",
                e
            );
            return Err(e.into());
        }
    };

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5742").await?;
    info!("Listening on http://127.0.0.1:5742");
    info!("Health check: http://127.0.0.1:5742/health");

    axum::serve(listener, app).await?;

    Ok(())
}
