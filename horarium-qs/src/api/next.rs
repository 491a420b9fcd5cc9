//! Next-occurrence query

use crate::error::{ApiError, ApiResult};
use crate::occurrence::next_occurrences;
use crate::{repo, AppState};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    /// Localized timestamp, e.g. "2026-08-05T10:00:00"; defaults to the
    /// current UTC time when omitted
    pub now: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct NextRow {
    pub parish_title: String,
    pub day_label: String,
    pub time_of_day: String,
    pub mass_type_label: String,
    pub days_ahead: u8,
}

#[derive(Debug, Serialize)]
pub struct NextResponse {
    pub results: Vec<NextRow>,
}

/// GET /api/next?now=..&limit=..
///
/// Upcoming services across all parishes with a confirmed schedule,
/// ordered soonest first. Timezone-naive: `now` is taken as already
/// localized by the caller.
pub async fn next_occurrences_query(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> ApiResult<Json<NextResponse>> {
    let now = match &query.now {
        Some(raw) => parse_now(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unparseable now timestamp: {}", raw)))?,
        None => chrono::Utc::now().naive_utc(),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let schedules = repo::parishes_with_schedules(&state.db).await?;
    let candidates: Vec<(String, _)> = schedules
        .into_iter()
        .map(|s| (s.parish.title, s.record.entries))
        .collect();

    let results = next_occurrences(&candidates, now, limit)
        .into_iter()
        .map(|o| NextRow {
            parish_title: o.parish_title,
            day_label: o.day.label().to_string(),
            time_of_day: horarium_common::schedule::format_time_of_day(o.time),
            mass_type_label: o.label,
            days_ahead: o.days_ahead,
        })
        .collect();

    Ok(Json(NextResponse { results }))
}

fn parse_now(raw: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    None
}
