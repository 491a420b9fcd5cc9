//! horarium-se library interface
//!
//! Exposes the extraction pipeline and HTTP router for integration testing.

pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod tiers;
pub mod types;
pub mod validate;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use orchestrator::InFlightSet;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use horarium_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Queue feeding the out-of-cycle trigger worker
    pub trigger_tx: mpsc::Sender<Uuid>,
    /// Parishes with an extraction currently in flight
    pub in_flight: InFlightSet,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, trigger_tx: mpsc::Sender<Uuid>) -> Self {
        Self {
            db,
            event_bus,
            trigger_tx,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/health", get(api::health))
        .route("/events", get(api::event_stream))
        .route("/api/reports", post(api::submit_report))
        .route("/api/extract/:parish_id", post(api::trigger_extraction))
        .with_state(state)
}
