//! Shared types and data contracts for the extraction pipeline
//!
//! Every tier strategy returns a `TierOutcome`, the single tagged result
//! shape at the orchestrator boundary. Validation and diffing consume that
//! shape only; nothing downstream branches on the source format again.

use horarium_common::schedule::ScheduleEntry;
use thiserror::Error;

/// What kind of raw content a fetch produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    CalendarFeed,
}

/// Raw source content for one parish, as fetched
#[derive(Debug, Clone)]
pub struct RawContent {
    pub kind: ContentKind,
    pub body: String,
}

/// Unified tier output: candidate entries plus a trust estimate.
///
/// `tier` is the tier number that produced the outcome (1 = structured,
/// 2 = heuristic HTML, 3 = free-text collaborator).
#[derive(Debug, Clone)]
pub struct TierOutcome {
    pub entries: Vec<ScheduleEntry>,
    pub confidence: f64,
    pub tier: u8,
}

/// Extraction pipeline error taxonomy
///
/// `Fetch` has already been retried by the source fetcher when it surfaces
/// here. `Parse`, `LowConfidence` and `Collaborator` escalate to the next
/// tier; on the last tier they terminate the run as a failed record.
/// `Database` is fatal for the run and retried on the next scheduled cycle.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Parse failed: {0}")]
    Parse(String),

    #[error("Confidence {confidence:.2} below tier threshold {threshold:.2}")]
    LowConfidence { confidence: f64, threshold: f64 },

    #[error("Collaborator call failed: {0}")]
    Collaborator(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Common error: {0}")]
    Common(#[from] horarium_common::Error),
}

pub type ExtractResult<T> = Result<T, ExtractError>;
