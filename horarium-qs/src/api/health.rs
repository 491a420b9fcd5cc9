//! Health endpoint

use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /health - service liveness and build identification
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime_seconds = (chrono::Utc::now() - state.startup_time).num_seconds();

    Json(json!({
        "status": "ok",
        "module": "horarium-qs",
        "version": env!("CARGO_PKG_VERSION"),
        "build": {
            "git_hash": env!("GIT_HASH"),
            "timestamp": env!("BUILD_TIMESTAMP"),
            "profile": env!("BUILD_PROFILE"),
        },
        "uptime_seconds": uptime_seconds,
    }))
}
