//! Database initialization
//!
//! Schema creation is idempotent (`CREATE TABLE IF NOT EXISTS`) and runs on
//! every startup, so a missing database file is not an error condition.

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while one extraction worker writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_settings_table(&pool).await?;
    create_parishes_table(&pool).await?;
    create_extraction_records_table(&pool).await?;
    create_diff_records_table(&pool).await?;
    create_user_reports_table(&pool).await?;

    Ok(pool)
}

/// Connect to an existing database in read-only mode.
///
/// Used by the query service, which must never mutate the audit trail.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
    Ok(pool)
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Parish identity and location. Owned by an external system of record;
/// rows are imported/synchronized from outside, never written by this core.
async fn create_parishes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parishes (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_extraction_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extraction_records (
            guid TEXT PRIMARY KEY,
            parish_id TEXT NOT NULL REFERENCES parishes(guid),
            tier INTEGER NOT NULL,
            entries TEXT NOT NULL,
            confidence REAL NOT NULL,
            validation_status TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Latest-confirmed resolution scans this index, never the full history
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_extraction_parish_status
         ON extraction_records(parish_id, validation_status, created_at DESC)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_diff_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS diff_records (
            guid TEXT PRIMARY KEY,
            parish_id TEXT NOT NULL REFERENCES parishes(guid),
            previous_record_id TEXT REFERENCES extraction_records(guid),
            new_record_id TEXT NOT NULL REFERENCES extraction_records(guid),
            change_type TEXT NOT NULL,
            changes TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_diff_created
         ON diff_records(created_at DESC)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_user_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_reports (
            guid TEXT PRIMARY KEY,
            parish_id TEXT NOT NULL REFERENCES parishes(guid),
            free_text TEXT NOT NULL,
            reporter TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_parish_status
         ON user_reports(parish_id, status)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
