//! Integration tests for database initialization and shared queries

use chrono::{DateTime, NaiveTime, Utc};
use horarium_common::db::models::{
    ChangeType, DiffRecord, ExtractionRecord, Parish, ReportStatus, ScheduleDiff, UserReport,
    ValidationStatus,
};
use horarium_common::db::{init_database, parishes, records, reports, settings};
use horarium_common::schedule::{DayOfWeek, ScheduleEntry};
use sqlx::SqlitePool;
use uuid::Uuid;

async fn setup_db() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("horarium.db"))
        .await
        .expect("Should initialize database");
    (pool, dir)
}

async fn insert_test_parish(pool: &SqlitePool) -> Parish {
    let parish = Parish {
        guid: Uuid::new_v4(),
        title: "St. Mary's".to_string(),
        url: "https://stmarys.example.org/mass-times".to_string(),
        latitude: Some(51.5),
        longitude: Some(-0.12),
        created_at: Utc::now(),
    };
    parishes::upsert_parish(pool, &parish).await.unwrap();
    parish
}

fn record_at(parish_id: Uuid, created_at: DateTime<Utc>, label: &str) -> ExtractionRecord {
    ExtractionRecord {
        guid: Uuid::new_v4(),
        parish_id,
        tier: 1,
        entries: vec![ScheduleEntry::new(
            DayOfWeek::Sunday,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            label,
        )],
        confidence: 0.95,
        validation_status: ValidationStatus::Confirmed,
        created_at,
    }
}

#[tokio::test]
async fn test_init_creates_schema_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("horarium.db");

    let pool = init_database(&db_path).await.unwrap();
    drop(pool);

    // Second init over the same file must succeed without error
    let pool = init_database(&db_path).await.unwrap();
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "diff_records",
        "extraction_records",
        "parishes",
        "settings",
        "user_reports",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "Missing table {} in {:?}",
            expected,
            tables
        );
    }
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (pool, _dir) = setup_db().await;

    assert!(settings::get_setting(&pool, "extraction.tier1_threshold")
        .await
        .unwrap()
        .is_none());

    settings::set_setting(&pool, "extraction.tier1_threshold", "0.85")
        .await
        .unwrap();
    settings::set_setting(&pool, "extraction.tier1_threshold", "0.9")
        .await
        .unwrap();

    assert_eq!(
        settings::get_setting(&pool, "extraction.tier1_threshold")
            .await
            .unwrap()
            .as_deref(),
        Some("0.9")
    );
}

#[tokio::test]
async fn test_latest_confirmed_resolves_greatest_created_at() {
    let (pool, _dir) = setup_db().await;
    let parish = insert_test_parish(&pool).await;

    let base = Utc::now();
    let oldest = record_at(parish.guid, base - chrono::Duration::hours(2), "Oldest");
    let newest = record_at(parish.guid, base, "Newest");
    let middle = record_at(parish.guid, base - chrono::Duration::hours(1), "Middle");

    // Insert out of chronological order: resolution must go by created_at,
    // not insertion order
    records::save_extraction_record(&pool, &oldest).await.unwrap();
    records::save_extraction_record(&pool, &newest).await.unwrap();
    records::save_extraction_record(&pool, &middle).await.unwrap();

    let resolved = records::latest_confirmed(&pool, parish.guid)
        .await
        .unwrap()
        .expect("Should resolve a confirmed record");
    assert_eq!(resolved.guid, newest.guid);
    assert_eq!(resolved.entries[0].label, "Newest");
}

#[tokio::test]
async fn test_latest_confirmed_ignores_pending_and_failed() {
    let (pool, _dir) = setup_db().await;
    let parish = insert_test_parish(&pool).await;

    let confirmed = record_at(parish.guid, Utc::now() - chrono::Duration::hours(1), "Confirmed");
    records::save_extraction_record(&pool, &confirmed).await.unwrap();

    let mut pending = record_at(parish.guid, Utc::now(), "Pending");
    pending.validation_status = ValidationStatus::Pending;
    records::save_extraction_record(&pool, &pending).await.unwrap();

    let mut failed = record_at(parish.guid, Utc::now(), "Failed");
    failed.validation_status = ValidationStatus::Failed;
    failed.entries.clear();
    failed.confidence = 0.0;
    records::save_extraction_record(&pool, &failed).await.unwrap();

    // The newer pending/failed records never shadow the confirmed one
    let resolved = records::latest_confirmed(&pool, parish.guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.guid, confirmed.guid);
}

#[tokio::test]
async fn test_latest_confirmed_none_without_history() {
    let (pool, _dir) = setup_db().await;
    let parish = insert_test_parish(&pool).await;

    assert!(records::latest_confirmed(&pool, parish.guid)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_extraction_record_round_trip() {
    let (pool, _dir) = setup_db().await;
    let parish = insert_test_parish(&pool).await;

    let record = record_at(parish.guid, Utc::now(), "Sunday Mass");
    records::save_extraction_record(&pool, &record).await.unwrap();

    let loaded = records::get_extraction_record(&pool, record.guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.parish_id, parish.guid);
    assert_eq!(loaded.tier, 1);
    assert_eq!(loaded.entries, record.entries);
    assert_eq!(loaded.validation_status, ValidationStatus::Confirmed);
}

#[tokio::test]
async fn test_diff_records_append_and_page() {
    let (pool, _dir) = setup_db().await;
    let parish = insert_test_parish(&pool).await;

    let record = record_at(parish.guid, Utc::now(), "Sunday Mass");
    records::save_extraction_record(&pool, &record).await.unwrap();

    let diff = DiffRecord {
        guid: Uuid::new_v4(),
        parish_id: parish.guid,
        previous_record_id: None,
        new_record_id: record.guid,
        change_type: ChangeType::AddedInitial,
        changes: ScheduleDiff {
            added: record.entries.clone(),
            ..Default::default()
        },
        created_at: Utc::now(),
    };
    records::save_diff_record(&pool, &diff).await.unwrap();

    assert_eq!(records::count_diff_records(&pool).await.unwrap(), 1);
    let page = records::list_diff_records(&pool, 50, 0).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].change_type, ChangeType::AddedInitial);
    assert!(page[0].previous_record_id.is_none());
    assert_eq!(page[0].changes.added.len(), 1);
}

#[tokio::test]
async fn test_report_intake_and_open_count() {
    let (pool, _dir) = setup_db().await;
    let parish = insert_test_parish(&pool).await;

    let report = UserReport {
        guid: Uuid::new_v4(),
        parish_id: parish.guid,
        free_text: "Sunday Mass moved to 11:00".to_string(),
        reporter: "visitor@example.org".to_string(),
        status: ReportStatus::New,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    reports::insert_report(&pool, &report).await.unwrap();

    assert_eq!(reports::open_report_count(&pool, parish.guid).await.unwrap(), 1);

    reports::set_report_status(&pool, report.guid, ReportStatus::Resolved)
        .await
        .unwrap();
    assert_eq!(reports::open_report_count(&pool, parish.guid).await.unwrap(), 0);

    let listed = reports::list_reports_for_parish(&pool, parish.guid)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ReportStatus::Resolved);
}
