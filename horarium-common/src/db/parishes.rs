//! Parish queries (read-only)
//!
//! Parishes are owned by an external system of record. This module only
//! reads them; the single insert helper exists for tests and for the
//! external synchronization job that mirrors the registry into SQLite.

use crate::db::models::Parish;
use crate::{Error, Result};
use chrono::DateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

type ParishRow = (String, String, String, Option<f64>, Option<f64>, i64);

fn parish_from_row(row: ParishRow) -> Result<Parish> {
    let (guid, title, url, latitude, longitude, created_at) = row;
    Ok(Parish {
        guid: Uuid::parse_str(&guid)
            .map_err(|e| Error::Internal(format!("Corrupt UUID column: {}", e)))?,
        title,
        url,
        latitude,
        longitude,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
    })
}

/// All known parishes, ordered by title for stable batch ordering
pub async fn list_parishes(pool: &SqlitePool) -> Result<Vec<Parish>> {
    let rows = sqlx::query_as::<_, ParishRow>(
        "SELECT guid, title, url, latitude, longitude, created_at
         FROM parishes ORDER BY title",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(parish_from_row).collect()
}

pub async fn get_parish(pool: &SqlitePool, guid: Uuid) -> Result<Option<Parish>> {
    let row = sqlx::query_as::<_, ParishRow>(
        "SELECT guid, title, url, latitude, longitude, created_at
         FROM parishes WHERE guid = ?",
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;
    row.map(parish_from_row).transpose()
}

/// Mirror one parish row from the external registry (tests and sync job)
pub async fn upsert_parish(pool: &SqlitePool, parish: &Parish) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO parishes (guid, title, url, latitude, longitude, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            title = excluded.title,
            url = excluded.url,
            latitude = excluded.latitude,
            longitude = excluded.longitude
        "#,
    )
    .bind(parish.guid.to_string())
    .bind(&parish.title)
    .bind(&parish.url)
    .bind(parish.latitude)
    .bind(parish.longitude)
    .bind(parish.created_at.timestamp())
    .execute(pool)
    .await?;
    Ok(())
}
