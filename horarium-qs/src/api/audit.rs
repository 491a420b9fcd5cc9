//! Admin audit feed
//!
//! Paginated, most-recent-first diff records joined to parish title and
//! extraction timestamp, with a human-readable change-count summary.

use crate::error::ApiResult;
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use horarium_common::db::models::ScheduleDiff;
use horarium_common::db::{parishes, records};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct AuditRow {
    pub diff_id: Uuid,
    pub parish_title: String,
    pub change_type: String,
    pub summary: String,
    pub changes: ScheduleDiff,
    /// When the new extraction record was created
    pub extracted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_results: i64,
    pub rows: Vec<AuditRow>,
}

/// GET /api/audit?page=N
pub async fn audit_feed(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditResponse>> {
    let total_results = records::count_diff_records(&state.db).await?;
    let pagination = calculate_pagination(total_results, query.page);

    let diffs = records::list_diff_records(&state.db, PAGE_SIZE, pagination.offset).await?;

    let titles: HashMap<Uuid, String> = parishes::list_parishes(&state.db)
        .await?
        .into_iter()
        .map(|p| (p.guid, p.title))
        .collect();

    let mut rows = Vec::with_capacity(diffs.len());
    for diff in diffs {
        let extracted_at = records::get_extraction_record(&state.db, diff.new_record_id)
            .await?
            .map(|r| r.created_at);

        rows.push(AuditRow {
            diff_id: diff.guid,
            parish_title: titles
                .get(&diff.parish_id)
                .cloned()
                .unwrap_or_else(|| "(unknown parish)".to_string()),
            change_type: diff.change_type.as_str().to_string(),
            summary: diff.changes.summary(),
            changes: diff.changes,
            extracted_at,
            created_at: diff.created_at,
        });
    }

    Ok(Json(AuditResponse {
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        total_results,
        rows,
    }))
}
