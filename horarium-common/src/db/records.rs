//! Extraction and diff record queries
//!
//! Records are append-only. The single read-side resolution rule lives here:
//! `latest_confirmed` returns the most recently created confirmed record,
//! with rowid as a deterministic tie-break for same-second inserts.

use crate::db::models::{DiffRecord, ExtractionRecord, ScheduleDiff, ValidationStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

type RecordRow = (String, String, i64, String, f64, String, i64);

fn record_from_row(row: RecordRow) -> Result<ExtractionRecord> {
    let (guid, parish_id, tier, entries_json, confidence, status, created_at) = row;
    Ok(ExtractionRecord {
        guid: parse_uuid(&guid)?,
        parish_id: parse_uuid(&parish_id)?,
        tier: tier as u8,
        entries: serde_json::from_str(&entries_json)
            .map_err(|e| Error::Internal(format!("Corrupt entries payload: {}", e)))?,
        confidence,
        validation_status: status.parse()?,
        created_at: timestamp_to_datetime(created_at),
    })
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt UUID column: {}", e)))
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Insert one extraction record. Records are never updated afterwards.
pub async fn save_extraction_record(pool: &SqlitePool, record: &ExtractionRecord) -> Result<()> {
    let entries_json = serde_json::to_string(&record.entries)
        .map_err(|e| Error::Internal(format!("Serialize entries failed: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO extraction_records
            (guid, parish_id, tier, entries, confidence, validation_status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.guid.to_string())
    .bind(record.parish_id.to_string())
    .bind(record.tier as i64)
    .bind(entries_json)
    .bind(record.confidence)
    .bind(record.validation_status.as_str())
    .bind(record.created_at.timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Resolve the single "latest confirmed" record for a parish.
///
/// All read paths consult this; nothing scans extraction history ad hoc.
pub async fn latest_confirmed(
    pool: &SqlitePool,
    parish_id: Uuid,
) -> Result<Option<ExtractionRecord>> {
    let row = sqlx::query_as::<_, RecordRow>(
        r#"
        SELECT guid, parish_id, tier, entries, confidence, validation_status, created_at
        FROM extraction_records
        WHERE parish_id = ? AND validation_status = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(parish_id.to_string())
    .bind(ValidationStatus::Confirmed.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(record_from_row).transpose()
}

/// Fetch a single extraction record by id
pub async fn get_extraction_record(
    pool: &SqlitePool,
    guid: Uuid,
) -> Result<Option<ExtractionRecord>> {
    let row = sqlx::query_as::<_, RecordRow>(
        r#"
        SELECT guid, parish_id, tier, entries, confidence, validation_status, created_at
        FROM extraction_records
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(record_from_row).transpose()
}

/// Append one diff record to the audit trail
pub async fn save_diff_record(pool: &SqlitePool, diff: &DiffRecord) -> Result<()> {
    let changes_json = serde_json::to_string(&diff.changes)
        .map_err(|e| Error::Internal(format!("Serialize changes failed: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO diff_records
            (guid, parish_id, previous_record_id, new_record_id, change_type, changes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(diff.guid.to_string())
    .bind(diff.parish_id.to_string())
    .bind(diff.previous_record_id.map(|u| u.to_string()))
    .bind(diff.new_record_id.to_string())
    .bind(diff.change_type.as_str())
    .bind(changes_json)
    .bind(diff.created_at.timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

type DiffRow = (String, String, Option<String>, String, String, String, i64);

fn diff_from_row(row: DiffRow) -> Result<DiffRecord> {
    let (guid, parish_id, previous, new, change_type, changes_json, created_at) = row;
    let changes: ScheduleDiff = serde_json::from_str(&changes_json)
        .map_err(|e| Error::Internal(format!("Corrupt changes payload: {}", e)))?;
    Ok(DiffRecord {
        guid: parse_uuid(&guid)?,
        parish_id: parse_uuid(&parish_id)?,
        previous_record_id: previous.as_deref().map(parse_uuid).transpose()?,
        new_record_id: parse_uuid(&new)?,
        change_type: change_type.parse()?,
        changes,
        created_at: timestamp_to_datetime(created_at),
    })
}

/// Total number of diff records (for audit-feed pagination)
pub async fn count_diff_records(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diff_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Page of diff records, most recent first
pub async fn list_diff_records(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<DiffRecord>> {
    let rows = sqlx::query_as::<_, DiffRow>(
        r#"
        SELECT guid, parish_id, previous_record_id, new_record_id, change_type, changes, created_at
        FROM diff_records
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(diff_from_row).collect()
}
