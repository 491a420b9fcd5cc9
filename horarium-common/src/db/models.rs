//! Database models
//!
//! Extraction and diff records are immutable once written: they are never
//! updated, only superseded by later records. "Latest confirmed" is a
//! resolution rule applied at read time, not a pointer column.

use crate::schedule::ScheduleEntry;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of an extraction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Confirmed,
    Rejected,
    Failed,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Confirmed => "confirmed",
            ValidationStatus::Rejected => "rejected",
            ValidationStatus::Failed => "failed",
        }
    }
}

impl FromStr for ValidationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ValidationStatus::Pending),
            "confirmed" => Ok(ValidationStatus::Confirmed),
            "rejected" => Ok(ValidationStatus::Rejected),
            "failed" => Ok(ValidationStatus::Failed),
            other => Err(Error::InvalidInput(format!("Unknown validation status: {}", other))),
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of the delta between two consecutive confirmed records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    NoChange,
    Added,
    Removed,
    Modified,
    Mixed,
    AddedInitial,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::NoChange => "no_change",
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
            ChangeType::Mixed => "mixed",
            ChangeType::AddedInitial => "added_initial",
        }
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "no_change" => Ok(ChangeType::NoChange),
            "added" => Ok(ChangeType::Added),
            "removed" => Ok(ChangeType::Removed),
            "modified" => Ok(ChangeType::Modified),
            "mixed" => Ok(ChangeType::Mixed),
            "added_initial" => Ok(ChangeType::AddedInitial),
            other => Err(Error::InvalidInput(format!("Unknown change type: {}", other))),
        }
    }
}

/// User report lifecycle state
///
/// Reports in `New` or `Investigating` state are "open" and block automatic
/// confirmation of extractions for their parish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    New,
    Investigating,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::New => "new",
            ReportStatus::Investigating => "investigating",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    /// Open reports act as a trust-degrading signal in validation
    pub fn is_open(self) -> bool {
        matches!(self, ReportStatus::New | ReportStatus::Investigating)
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(ReportStatus::New),
            "investigating" => Ok(ReportStatus::Investigating),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            other => Err(Error::InvalidInput(format!("Unknown report status: {}", other))),
        }
    }
}

/// A place of worship, owned by an external system of record.
///
/// This core only reads parishes; it never writes title or location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parish {
    pub guid: Uuid,
    pub title: String,
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Parish {
    /// Parishes without a location are excluded from proximity search
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// One immutable snapshot from one orchestrator run for one parish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub guid: Uuid,
    pub parish_id: Uuid,
    /// Lowest tier number that produced an accepted result (1-3);
    /// 0 when the run failed before any tier produced output
    pub tier: u8,
    /// Ordered schedule entries (empty on a failed run)
    pub entries: Vec<ScheduleEntry>,
    /// Trust estimate in [0.0, 1.0]
    pub confidence: f64,
    pub validation_status: ValidationStatus,
    pub created_at: DateTime<Utc>,
}

/// A before/after pair for an entry whose label changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedEntry {
    pub before: ScheduleEntry,
    pub after: ScheduleEntry,
}

/// The three change sets of a diff record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDiff {
    pub added: Vec<ScheduleEntry>,
    pub removed: Vec<ScheduleEntry>,
    pub modified: Vec<ModifiedEntry>,
}

impl ScheduleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Human-readable change-count summary, e.g. "2 added, 1 modified"
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.added.is_empty() {
            parts.push(format!("{} added", self.added.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("{} removed", self.removed.len()));
        }
        if !self.modified.is_empty() {
            parts.push(format!("{} modified", self.modified.len()));
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Audit-trail link between two consecutive confirmed extraction records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRecord {
    pub guid: Uuid,
    pub parish_id: Uuid,
    /// None for the first confirmed record of a parish (`added_initial`)
    pub previous_record_id: Option<Uuid>,
    pub new_record_id: Uuid,
    pub change_type: ChangeType,
    pub changes: ScheduleDiff,
    pub created_at: DateTime<Utc>,
}

/// A free-form manual correction tied to a parish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    pub guid: Uuid,
    pub parish_id: Uuid,
    pub free_text: String,
    pub reporter: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips() {
        for s in [
            ValidationStatus::Pending,
            ValidationStatus::Confirmed,
            ValidationStatus::Rejected,
            ValidationStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<ValidationStatus>().unwrap(), s);
        }
        for c in [
            ChangeType::NoChange,
            ChangeType::Added,
            ChangeType::Removed,
            ChangeType::Modified,
            ChangeType::Mixed,
            ChangeType::AddedInitial,
        ] {
            assert_eq!(c.as_str().parse::<ChangeType>().unwrap(), c);
        }
    }

    #[test]
    fn test_open_reports() {
        assert!(ReportStatus::New.is_open());
        assert!(ReportStatus::Investigating.is_open());
        assert!(!ReportStatus::Resolved.is_open());
        assert!(!ReportStatus::Dismissed.is_open());
    }

    #[test]
    fn test_diff_summary() {
        let mut diff = ScheduleDiff::default();
        assert_eq!(diff.summary(), "no changes");
        diff.added.push(ScheduleEntry::new(
            crate::DayOfWeek::Sunday,
            chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            "Sunday Mass",
        ));
        assert_eq!(diff.summary(), "1 added");
    }
}
