//! Out-of-cycle extraction trigger

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use horarium_common::db::parishes;
use horarium_common::events::HorariumEvent;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

/// POST /api/extract/:parish_id
///
/// Enqueues an out-of-cycle orchestrator run. Returns 409 while an
/// extraction for the parish is already in flight; same-parish runs are
/// serialized, never stacked.
pub async fn trigger_extraction(
    State(state): State<AppState>,
    Path(parish_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let parish = parishes::get_parish(&state.db, parish_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Parish {}", parish_id)))?;

    if state.in_flight.lock().await.contains(&parish_id) {
        return Err(ApiError::Conflict(format!(
            "Extraction already in flight for parish {}",
            parish_id
        )));
    }

    state
        .trigger_tx
        .try_send(parish_id)
        .map_err(|_| ApiError::Conflict("Trigger queue is full".to_string()))?;

    info!(parish_id = %parish.guid, "Out-of-cycle extraction enqueued");
    state
        .event_bus
        .emit(HorariumEvent::ExtractionTriggered { parish_id });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "enqueued", "parish_id": parish_id })),
    ))
}
