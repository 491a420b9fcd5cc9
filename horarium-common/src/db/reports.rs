//! User report queries
//!
//! The intake path is a plain INSERT, safe under unlimited concurrent
//! producers. Status transitions happen under moderator action.

use crate::db::models::{ReportStatus, UserReport};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

type ReportRow = (String, String, String, String, String, i64, i64);

fn report_from_row(row: ReportRow) -> Result<UserReport> {
    let (guid, parish_id, free_text, reporter, status, created_at, updated_at) = row;
    let parse = |s: &str| {
        Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt UUID column: {}", e)))
    };
    Ok(UserReport {
        guid: parse(&guid)?,
        parish_id: parse(&parish_id)?,
        free_text,
        reporter,
        status: status.parse()?,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        updated_at: DateTime::from_timestamp(updated_at, 0).unwrap_or_default(),
    })
}

pub async fn insert_report(pool: &SqlitePool, report: &UserReport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_reports
            (guid, parish_id, free_text, reporter, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report.guid.to_string())
    .bind(report.parish_id.to_string())
    .bind(&report.free_text)
    .bind(&report.reporter)
    .bind(report.status.as_str())
    .bind(report.created_at.timestamp())
    .bind(report.updated_at.timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Number of open (new/investigating) reports for a parish.
///
/// A non-zero count blocks automatic confirmation during validation.
pub async fn open_report_count(pool: &SqlitePool, parish_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_reports
         WHERE parish_id = ? AND status IN ('new', 'investigating')",
    )
    .bind(parish_id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn list_reports_for_parish(
    pool: &SqlitePool,
    parish_id: Uuid,
) -> Result<Vec<UserReport>> {
    let rows = sqlx::query_as::<_, ReportRow>(
        "SELECT guid, parish_id, free_text, reporter, status, created_at, updated_at
         FROM user_reports WHERE parish_id = ?
         ORDER BY created_at DESC",
    )
    .bind(parish_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(report_from_row).collect()
}

/// Transition a report through its status machine (moderator action)
pub async fn set_report_status(
    pool: &SqlitePool,
    guid: Uuid,
    status: ReportStatus,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE user_reports SET status = ?, updated_at = ? WHERE guid = ?",
    )
    .bind(status.as_str())
    .bind(Utc::now().timestamp())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User report {}", guid)));
    }
    Ok(())
}
