//! End-to-end pipeline tests: tier escalation, validation, diffing and
//! persistence over fixture content, no network involved.

use chrono::Utc;
use horarium_common::db::models::{ChangeType, Parish, ReportStatus, UserReport, ValidationStatus};
use horarium_common::db::{init_database, parishes, records, reports};
use horarium_common::events::EventBus;
use horarium_common::schedule::DayOfWeek;
use horarium_se::config::ExtractionConfig;
use horarium_se::orchestrator::Orchestrator;
use horarium_se::types::{ContentKind, RawContent};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

async fn setup() -> (SqlitePool, Orchestrator, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("horarium.db")).await.unwrap();

    let orchestrator = Orchestrator::new(
        db.clone(),
        EventBus::new(16),
        ExtractionConfig::default(),
        Arc::new(Mutex::new(HashSet::new())),
    )
    .unwrap();

    (db, orchestrator, dir)
}

async fn insert_parish(db: &SqlitePool, title: &str) -> Parish {
    let parish = Parish {
        guid: Uuid::new_v4(),
        title: title.to_string(),
        url: "https://parish.example.org/mass-times".to_string(),
        latitude: Some(53.35),
        longitude: Some(-6.26),
        created_at: Utc::now(),
    };
    parishes::upsert_parish(db, &parish).await.unwrap();
    parish
}

fn html(body: &str) -> RawContent {
    RawContent {
        kind: ContentKind::Html,
        body: body.to_string(),
    }
}

/// First run for a parish with a malformed feed: tier 1 fails, tier 2
/// parses the page, the record confirms and the diff is added_initial.
#[tokio::test]
async fn test_first_run_tier2_confirms_with_initial_diff() {
    let (db, orchestrator, _dir) = setup().await;
    let parish = insert_parish(&db, "St. Mary's").await;

    let content = html(
        "<html><head>\
         <script type=\"application/ld+json\">{this is not json</script>\
         </head><body>\
         <h2>Mass Times</h2>\
         <p>Sunday Mass: 10:00 am</p>\
         </body></html>",
    );

    let record = orchestrator.process_content(&parish, content).await.unwrap();

    assert_eq!(record.tier, 2);
    assert_eq!(record.validation_status, ValidationStatus::Confirmed);
    assert!(record.confidence >= 0.6);
    assert_eq!(record.entries.len(), 1);
    assert_eq!(record.entries[0].day, DayOfWeek::Sunday);

    let diffs = records::list_diff_records(&db, 10, 0).await.unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].change_type, ChangeType::AddedInitial);
    assert!(diffs[0].previous_record_id.is_none());
    assert_eq!(diffs[0].new_record_id, record.guid);
}

/// Second run where tier 1 now succeeds with an extra vigil service: the
/// diff classifies exactly one added entry.
#[tokio::test]
async fn test_second_run_tier1_adds_vigil() {
    let (db, orchestrator, _dir) = setup().await;
    let parish = insert_parish(&db, "St. Mary's").await;

    // First run: heuristic only
    let first = html("<p>Sunday Mass: 10:00 am</p>");
    let first_record = orchestrator.process_content(&parish, first).await.unwrap();
    assert_eq!(first_record.tier, 2);

    // Second run: structured data appears, same Sunday service plus a vigil
    let second = html(
        "<script type=\"application/ld+json\">[\
         {\"byDay\": \"Sunday\", \"startTime\": \"10:00\", \"name\": \"Mass\"},\
         {\"byDay\": \"Saturday\", \"startTime\": \"17:00\", \"name\": \"Vigil Mass\"}\
         ]</script>",
    );
    let second_record = orchestrator.process_content(&parish, second).await.unwrap();

    assert_eq!(second_record.tier, 1);
    assert_eq!(second_record.validation_status, ValidationStatus::Confirmed);
    assert!(second_record.confidence >= 0.9);

    let diffs = records::list_diff_records(&db, 10, 0).await.unwrap();
    assert_eq!(diffs.len(), 2);
    // Most recent first
    let latest = &diffs[0];
    assert_eq!(latest.change_type, ChangeType::Added);
    assert_eq!(latest.changes.added.len(), 1);
    assert_eq!(latest.changes.added[0].day, DayOfWeek::Saturday);
    assert_eq!(latest.changes.added[0].label, "Vigil Mass");
    assert_eq!(latest.previous_record_id, Some(first_record.guid));
}

/// Total failure writes one failed record and leaves the previous
/// confirmed record authoritative for reads.
#[tokio::test]
async fn test_total_failure_preserves_latest_confirmed() {
    let (db, orchestrator, _dir) = setup().await;
    let parish = insert_parish(&db, "St. Kevin's").await;

    let good = html("<p>Sunday Mass: 10:00 am</p>");
    let confirmed = orchestrator.process_content(&parish, good).await.unwrap();
    assert_eq!(confirmed.validation_status, ValidationStatus::Confirmed);

    // Page degraded to something no tier can read (tier 3 unconfigured)
    let broken = html("<p>Welcome to our parish community page</p>");
    let failed = orchestrator.process_content(&parish, broken).await.unwrap();

    assert_eq!(failed.validation_status, ValidationStatus::Failed);
    assert_eq!(failed.tier, 0);
    assert!(failed.entries.is_empty());
    assert_eq!(failed.confidence, 0.0);

    // Reads still resolve to the confirmed record
    let resolved = records::latest_confirmed(&db, parish.guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.guid, confirmed.guid);

    // Failed runs produce no diff record
    let diffs = records::list_diff_records(&db, 10, 0).await.unwrap();
    assert_eq!(diffs.len(), 1);
}

/// An open user report downgrades an otherwise-confirmable extraction to
/// pending; nothing is published.
#[tokio::test]
async fn test_open_report_blocks_confirmation() {
    let (db, orchestrator, _dir) = setup().await;
    let parish = insert_parish(&db, "St. Brigid's").await;

    let now = Utc::now();
    reports::insert_report(
        &db,
        &UserReport {
            guid: Uuid::new_v4(),
            parish_id: parish.guid,
            free_text: "Sunday Mass moved to 11:00".to_string(),
            reporter: "visitor@example.org".to_string(),
            status: ReportStatus::New,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .unwrap();

    let content = html(
        "<script type=\"application/ld+json\">\
         {\"byDay\": \"Sunday\", \"startTime\": \"10:00\", \"name\": \"Sunday Mass\"}\
         </script>",
    );
    let record = orchestrator.process_content(&parish, content).await.unwrap();

    // Confidence 0.95 would confirm, but the open report blocks it
    assert!(record.confidence >= 0.9);
    assert_eq!(record.validation_status, ValidationStatus::Pending);

    assert!(records::latest_confirmed(&db, parish.guid)
        .await
        .unwrap()
        .is_none());
    assert!(records::list_diff_records(&db, 10, 0)
        .await
        .unwrap()
        .is_empty());
}

/// Self-inconsistent structured data (same key, conflicting labels) is
/// rejected regardless of confidence.
#[tokio::test]
async fn test_conflicting_entries_rejected() {
    let (db, orchestrator, _dir) = setup().await;
    let parish = insert_parish(&db, "St. Audoen's").await;

    let content = html(
        "<script type=\"application/ld+json\">[\
         {\"byDay\": \"Sunday\", \"startTime\": \"10:00\", \"name\": \"Low Mass\"},\
         {\"byDay\": \"Sunday\", \"startTime\": \"10:00\", \"name\": \"High Mass\"}\
         ]</script>",
    );
    let record = orchestrator.process_content(&parish, content).await.unwrap();

    assert_eq!(record.validation_status, ValidationStatus::Rejected);
    assert!(records::latest_confirmed(&db, parish.guid)
        .await
        .unwrap()
        .is_none());
}

/// A no-change re-extraction still writes an extraction record (audit
/// completeness) and a no_change diff record.
#[tokio::test]
async fn test_unchanged_schedule_diffs_as_no_change() {
    let (db, orchestrator, _dir) = setup().await;
    let parish = insert_parish(&db, "St. Nicholas'").await;

    let page = "<script type=\"application/ld+json\">\
                {\"byDay\": \"Sunday\", \"startTime\": \"10:00\", \"name\": \"Sunday Mass\"}\
                </script>";

    orchestrator
        .process_content(&parish, html(page))
        .await
        .unwrap();
    orchestrator
        .process_content(&parish, html(page))
        .await
        .unwrap();

    let diffs = records::list_diff_records(&db, 10, 0).await.unwrap();
    assert_eq!(diffs.len(), 2);
    assert_eq!(diffs[0].change_type, ChangeType::NoChange);
    assert!(diffs[0].changes.is_empty());
    assert_eq!(diffs[1].change_type, ChangeType::AddedInitial);
}
