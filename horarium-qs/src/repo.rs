//! Parish repository
//!
//! Read-only join of parish identity/location with each parish's latest
//! confirmed extraction. Resolution always goes through the shared
//! `latest_confirmed` query; nothing here scans extraction history ad hoc.

use horarium_common::db::models::{ExtractionRecord, Parish};
use horarium_common::db::{parishes, records};
use horarium_common::Result;
use sqlx::SqlitePool;

/// A parish together with its currently published schedule
#[derive(Debug, Clone)]
pub struct ParishSchedule {
    pub parish: Parish,
    pub record: ExtractionRecord,
}

/// All parishes that have a confirmed extraction.
///
/// Parishes without any confirmed record are excluded: they have nothing
/// publishable, and the scheduler must not see them.
pub async fn parishes_with_schedules(pool: &SqlitePool) -> Result<Vec<ParishSchedule>> {
    let all = parishes::list_parishes(pool).await?;

    let mut result = Vec::with_capacity(all.len());
    for parish in all {
        if let Some(record) = records::latest_confirmed(pool, parish.guid).await? {
            result.push(ParishSchedule { parish, record });
        }
    }
    Ok(result)
}

/// All parishes that have a location (proximity search population)
pub async fn parishes_with_location(pool: &SqlitePool) -> Result<Vec<Parish>> {
    let all = parishes::list_parishes(pool).await?;
    Ok(all.into_iter().filter(|p| p.location().is_some()).collect())
}
