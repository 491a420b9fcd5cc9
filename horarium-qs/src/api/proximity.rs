//! Geographic proximity search

use crate::error::{ApiError, ApiResult};
use crate::geo::{haversine_km, BoundingBox};
use crate::{repo, AppState};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest accepted search radius; beyond this the "nearby parishes" use
/// case has stopped making sense and the scan cost grows for nothing
const MAX_RADIUS_KM: f64 = 1000.0;

#[derive(Debug, Deserialize)]
pub struct ProximityQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
}

#[derive(Debug, Serialize)]
pub struct ProximityRow {
    pub parish_title: String,
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
    pub parish_url: String,
}

#[derive(Debug, Serialize)]
pub struct ProximityResponse {
    pub results: Vec<ProximityRow>,
}

/// GET /api/proximity?lat=..&lng=..&radius_km=..
///
/// Bounding-box pre-filter, exact Haversine on survivors, ascending by
/// distance. Parishes without a location never appear.
pub async fn proximity_query(
    State(state): State<AppState>,
    Query(query): Query<ProximityQuery>,
) -> ApiResult<Json<ProximityResponse>> {
    if !(-90.0..=90.0).contains(&query.lat) {
        return Err(ApiError::BadRequest(format!("lat out of range: {}", query.lat)));
    }
    if !(-180.0..=180.0).contains(&query.lng) {
        return Err(ApiError::BadRequest(format!("lng out of range: {}", query.lng)));
    }
    if !(query.radius_km > 0.0 && query.radius_km <= MAX_RADIUS_KM) {
        return Err(ApiError::BadRequest(format!(
            "radius_km must be in (0, {}]: {}",
            MAX_RADIUS_KM, query.radius_km
        )));
    }

    let candidates = repo::parishes_with_location(&state.db).await?;
    let bbox = BoundingBox::around(query.lat, query.lng, query.radius_km);

    let mut results: Vec<ProximityRow> = Vec::new();
    for parish in &candidates {
        let Some((lat, lng)) = parish.location() else {
            continue;
        };
        if !bbox.contains(lat, lng) {
            continue;
        }
        let distance_km = haversine_km(query.lat, query.lng, lat, lng);
        if distance_km <= query.radius_km {
            results.push(ProximityRow {
                parish_title: parish.title.clone(),
                lat,
                lng,
                distance_km,
                parish_url: parish.url.clone(),
            });
        }
    }

    results.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        candidates = candidates.len(),
        matches = results.len(),
        radius_km = query.radius_km,
        "Proximity query served"
    );

    Ok(Json(ProximityResponse { results }))
}
