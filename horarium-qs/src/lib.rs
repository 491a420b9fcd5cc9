//! horarium-qs library - Query Service
//!
//! Read-only query surface over the extraction store: geographic proximity
//! search, next-occurrence scheduling and the admin audit feed. Never
//! mutates the audit trail; extraction failures upstream are invisible
//! here because reads always resolve the last confirmed record.

pub mod api;
pub mod error;
pub mod geo;
pub mod occurrence;
pub mod pagination;
pub mod repo;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only)
    pub db: SqlitePool,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/health", get(api::health))
        .route("/api/proximity", get(api::proximity_query))
        .route("/api/next", get(api::next_occurrences_query))
        .route("/api/audit", get(api::audit_feed))
        .with_state(state)
}
