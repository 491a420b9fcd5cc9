//! Extraction orchestrator
//!
//! Drives fetch + tier escalation for one parish and writes exactly one
//! immutable extraction record per invocation, including on total failure
//! (the audit trail records every attempt). The batch driver runs many
//! parishes concurrently under a bounded worker pool; per-parish failures
//! are contained and never abort the batch.

use crate::config::ExtractionConfig;
use crate::diff::diff_schedules;
use crate::fetch::SourceFetcher;
use crate::tiers::{freetext::FreeTextClient, heuristic, html_to_text, structured};
use crate::types::{ContentKind, ExtractError, ExtractResult, RawContent, TierOutcome};
use crate::validate::validate;
use chrono::Utc;
use horarium_common::db::models::{DiffRecord, ExtractionRecord, Parish, ValidationStatus};
use horarium_common::db::{parishes, records, reports};
use horarium_common::events::{EventBus, HorariumEvent};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Parishes currently being extracted; guards against overlapping runs for
/// the same parish so its record history stays monotonic in time.
pub type InFlightSet = Arc<Mutex<HashSet<Uuid>>>;

/// Outcome of one batch run
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Orchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    fetcher: SourceFetcher,
    freetext: Option<FreeTextClient>,
    config: ExtractionConfig,
    in_flight: InFlightSet,
}

impl Orchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        config: ExtractionConfig,
        in_flight: InFlightSet,
    ) -> ExtractResult<Self> {
        let fetcher = SourceFetcher::new(&config)?;
        let freetext = FreeTextClient::from_config(&config)?;
        if freetext.is_none() {
            info!("Tier 3 collaborator not configured; extraction stops at tier 2");
        }
        Ok(Self {
            db,
            event_bus,
            fetcher,
            freetext,
            config,
            in_flight,
        })
    }

    /// Extract one parish: fetch, escalate through tiers, validate, persist.
    ///
    /// Always writes exactly one extraction record, even when the fetch or
    /// every tier fails. Only a storage failure surfaces as an error.
    pub async fn extract_parish(&self, parish: &Parish) -> ExtractResult<ExtractionRecord> {
        let content = match self.fetcher.fetch(&parish.url).await {
            Ok(content) => content,
            Err(ExtractError::Fetch(msg)) => {
                warn!(parish_id = %parish.guid, error = %msg, "Fetch failed, recording failed run");
                return self.write_failed_record(parish).await;
            }
            Err(e) => return Err(e),
        };
        self.process_content(parish, content).await
    }

    /// Run tiers + validation + diff over already-fetched content.
    ///
    /// Split from `extract_parish` so the pipeline can be exercised without
    /// a network.
    pub async fn process_content(
        &self,
        parish: &Parish,
        content: RawContent,
    ) -> ExtractResult<ExtractionRecord> {
        let Some(outcome) = self.run_tiers(parish, &content).await else {
            return self.write_failed_record(parish).await;
        };

        let open_reports = reports::open_report_count(&self.db, parish.guid).await?;
        let status = validate(
            outcome.confidence,
            self.threshold_for(outcome.tier),
            self.config.confidence_floor,
            &outcome.entries,
            open_reports,
        );

        // Resolve the previous confirmed record before inserting the new
        // one, otherwise the new record would diff against itself
        let previous = records::latest_confirmed(&self.db, parish.guid).await?;

        let record = ExtractionRecord {
            guid: Uuid::new_v4(),
            parish_id: parish.guid,
            tier: outcome.tier,
            entries: outcome.entries,
            confidence: outcome.confidence,
            validation_status: status,
            created_at: Utc::now(),
        };
        records::save_extraction_record(&self.db, &record).await?;

        info!(
            parish_id = %parish.guid,
            tier = record.tier,
            confidence = record.confidence,
            status = %record.validation_status,
            entries = record.entries.len(),
            "Extraction record written"
        );

        if status == ValidationStatus::Confirmed {
            let (change_type, changes) = diff_schedules(
                previous.as_ref().map(|r| r.entries.as_slice()),
                &record.entries,
            );
            let diff = DiffRecord {
                guid: Uuid::new_v4(),
                parish_id: parish.guid,
                previous_record_id: previous.as_ref().map(|r| r.guid),
                new_record_id: record.guid,
                change_type,
                changes,
                created_at: Utc::now(),
            };
            records::save_diff_record(&self.db, &diff).await?;

            info!(
                parish_id = %parish.guid,
                change_type = change_type.as_str(),
                summary = %diff.changes.summary(),
                "Diff record written"
            );
        }

        Ok(record)
    }

    /// Try tiers in trust order; the first acceptable outcome wins.
    ///
    /// A tier is acceptable when it returns a non-empty entry list with
    /// confidence at or above its configured threshold. Tier errors and
    /// sub-threshold scores escalate to the next tier.
    async fn run_tiers(&self, parish: &Parish, content: &RawContent) -> Option<TierOutcome> {
        match structured::extract(content) {
            Ok(outcome) if self.accepts(&outcome, self.config.tier1_threshold) => {
                return Some(outcome)
            }
            Ok(outcome) => debug!(
                parish_id = %parish.guid,
                tier = 1,
                confidence = outcome.confidence,
                "Tier outcome below threshold, escalating"
            ),
            Err(e) => debug!(parish_id = %parish.guid, tier = 1, error = %e, "Tier failed, escalating"),
        }

        match heuristic::extract(content) {
            Ok(outcome) if self.accepts(&outcome, self.config.tier2_threshold) => {
                return Some(outcome)
            }
            Ok(outcome) => debug!(
                parish_id = %parish.guid,
                tier = 2,
                confidence = outcome.confidence,
                "Tier outcome below threshold, escalating"
            ),
            Err(e) => debug!(parish_id = %parish.guid, tier = 2, error = %e, "Tier failed, escalating"),
        }

        if let Some(client) = &self.freetext {
            let text = match content.kind {
                ContentKind::Html => html_to_text(&content.body),
                ContentKind::CalendarFeed => content.body.clone(),
            };
            match client.extract(&text).await {
                Ok(outcome) if self.accepts(&outcome, self.config.tier3_threshold) => {
                    return Some(outcome)
                }
                Ok(outcome) => debug!(
                    parish_id = %parish.guid,
                    tier = 3,
                    confidence = outcome.confidence,
                    "Tier outcome below threshold"
                ),
                Err(e) => debug!(parish_id = %parish.guid, tier = 3, error = %e, "Tier failed"),
            }
        }

        None
    }

    fn accepts(&self, outcome: &TierOutcome, threshold: f64) -> bool {
        !outcome.entries.is_empty() && outcome.confidence >= threshold
    }

    fn threshold_for(&self, tier: u8) -> f64 {
        match tier {
            1 => self.config.tier1_threshold,
            2 => self.config.tier2_threshold,
            _ => self.config.tier3_threshold,
        }
    }

    /// Terminal failure for this run: empty entries, confidence 0.0,
    /// status failed, tier 0 (no tier produced an accepted result). The
    /// previous latest-confirmed record remains authoritative for reads.
    async fn write_failed_record(&self, parish: &Parish) -> ExtractResult<ExtractionRecord> {
        let record = ExtractionRecord {
            guid: Uuid::new_v4(),
            parish_id: parish.guid,
            tier: 0,
            entries: Vec::new(),
            confidence: 0.0,
            validation_status: ValidationStatus::Failed,
            created_at: Utc::now(),
        };
        records::save_extraction_record(&self.db, &record).await?;
        info!(parish_id = %parish.guid, "Failed extraction record written");
        Ok(record)
    }

    async fn begin(&self, parish_id: Uuid) -> bool {
        self.in_flight.lock().await.insert(parish_id)
    }

    async fn finish(&self, parish_id: Uuid) {
        self.in_flight.lock().await.remove(&parish_id);
    }

    /// Run one extraction batch over all known parishes.
    ///
    /// Bounded worker pool; each parish succeeds or fails independently.
    pub async fn run_batch(self: &Arc<Self>) -> BatchSummary {
        let start = Instant::now();
        let batch_id = Uuid::new_v4();

        let parish_list = match parishes::list_parishes(&self.db).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Could not list parishes, skipping batch");
                return BatchSummary {
                    succeeded: 0,
                    failed: 0,
                };
            }
        };

        info!(batch_id = %batch_id, parishes = parish_list.len(), "Extraction batch starting");
        self.event_bus.emit(HorariumEvent::BatchStarted {
            batch_id,
            parish_count: parish_list.len(),
            timestamp: Utc::now(),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size));
        let mut join_set: JoinSet<bool> = JoinSet::new();

        for parish in parish_list {
            // A parish already running from an out-of-cycle trigger keeps
            // its in-flight slot; skipping preserves serialization
            if !self.begin(parish.guid).await {
                debug!(parish_id = %parish.guid, "Extraction already in flight, skipping");
                continue;
            }

            let orchestrator = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        orchestrator.finish(parish.guid).await;
                        return false;
                    }
                };

                let result = orchestrator.extract_parish(&parish).await;
                orchestrator.finish(parish.guid).await;

                match result {
                    Ok(record) => {
                        orchestrator.event_bus.emit(HorariumEvent::ParishExtracted {
                            parish_id: parish.guid,
                            tier: record.tier,
                            confidence: record.confidence,
                            status: record.validation_status.as_str().to_string(),
                            entry_count: record.entries.len(),
                        });
                        true
                    }
                    Err(e) => {
                        // Contained: the batch continues, the next cycle retries
                        warn!(parish_id = %parish.guid, error = %e, "Parish extraction failed");
                        orchestrator.event_bus.emit(HorariumEvent::ParishFailed {
                            parish_id: parish.guid,
                            error: e.to_string(),
                        });
                        false
                    }
                }
            });
        }

        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    warn!(error = %e, "Extraction task panicked");
                    failed += 1;
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            batch_id = %batch_id,
            succeeded = succeeded,
            failed = failed,
            duration_ms = duration_ms,
            "Extraction batch complete"
        );
        self.event_bus.emit(HorariumEvent::BatchCompleted {
            batch_id,
            succeeded,
            failed,
            duration_ms,
        });

        BatchSummary { succeeded, failed }
    }

    /// Run one out-of-cycle extraction for a single parish
    pub async fn run_single(self: &Arc<Self>, parish_id: Uuid) {
        let parish = match parishes::get_parish(&self.db, parish_id).await {
            Ok(Some(parish)) => parish,
            Ok(None) => {
                warn!(parish_id = %parish_id, "Triggered extraction for unknown parish");
                return;
            }
            Err(e) => {
                warn!(parish_id = %parish_id, error = %e, "Parish lookup failed");
                return;
            }
        };

        if !self.begin(parish_id).await {
            debug!(parish_id = %parish_id, "Extraction already in flight, dropping trigger");
            return;
        }

        let result = self.extract_parish(&parish).await;
        self.finish(parish_id).await;

        match result {
            Ok(record) => {
                self.event_bus.emit(HorariumEvent::ParishExtracted {
                    parish_id,
                    tier: record.tier,
                    confidence: record.confidence,
                    status: record.validation_status.as_str().to_string(),
                    entry_count: record.entries.len(),
                });
            }
            Err(e) => {
                warn!(parish_id = %parish_id, error = %e, "Triggered extraction failed");
                self.event_bus.emit(HorariumEvent::ParishFailed {
                    parish_id,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Scheduled batch loop: one full batch per configured interval.
///
/// The first batch runs immediately at startup.
pub async fn batch_loop(orchestrator: Arc<Orchestrator>) {
    let period = std::time::Duration::from_secs(orchestrator.config.batch_interval_minutes * 60);
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        orchestrator.run_batch().await;
    }
}

/// Worker draining the out-of-cycle trigger queue, one parish at a time
pub async fn trigger_worker(orchestrator: Arc<Orchestrator>, mut rx: mpsc::Receiver<Uuid>) {
    while let Some(parish_id) = rx.recv().await {
        orchestrator.run_single(parish_id).await;
    }
}
