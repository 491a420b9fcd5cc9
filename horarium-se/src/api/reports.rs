//! User report intake
//!
//! `submit_report` is a plain append: safe under unlimited concurrent
//! producers. Reports enter the status machine as `new` and act as a
//! trust-degrading signal in validation until a moderator resolves them.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use horarium_common::db::models::{ReportStatus, UserReport};
use horarium_common::db::{parishes, reports};
use horarium_common::events::HorariumEvent;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub parish_id: Uuid,
    pub free_text: String,
    #[serde(default)]
    pub reporter: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitReportResponse {
    pub report_id: Uuid,
    pub status: String,
}

/// POST /api/reports
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<SubmitReportRequest>,
) -> ApiResult<(StatusCode, Json<SubmitReportResponse>)> {
    if request.free_text.trim().is_empty() {
        return Err(ApiError::BadRequest("free_text must not be empty".to_string()));
    }

    let parish = parishes::get_parish(&state.db, request.parish_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Parish {}", request.parish_id)))?;

    let now = Utc::now();
    let report = UserReport {
        guid: Uuid::new_v4(),
        parish_id: parish.guid,
        free_text: request.free_text.trim().to_string(),
        reporter: request.reporter.trim().to_string(),
        status: ReportStatus::New,
        created_at: now,
        updated_at: now,
    };
    reports::insert_report(&state.db, &report).await?;

    info!(
        parish_id = %parish.guid,
        report_id = %report.guid,
        "User report submitted"
    );
    state.event_bus.emit(HorariumEvent::ReportSubmitted {
        parish_id: parish.guid,
        report_id: report.guid,
    });

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResponse {
            report_id: report.guid,
            status: ReportStatus::New.as_str().to_string(),
        }),
    ))
}
