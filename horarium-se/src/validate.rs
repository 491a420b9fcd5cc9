//! Validation engine
//!
//! Assigns a validation status to a freshly extracted result. Pure and
//! synchronous; the orchestrator supplies the open-report count so this
//! module never touches the database.
//!
//! Rules, first match wins:
//! (a) confidence below the floor -> rejected
//! (b) entries self-inconsistent (duplicate day+time key with conflicting
//!     labels) -> rejected
//! (c) confidence at or above the producing tier's threshold and no open
//!     user report for the parish -> confirmed
//! (d) otherwise -> pending
//!
//! Rule (c)'s report check is the primary defense against silently
//! publishing an extraction that contradicts a known-good manual
//! correction.

use chrono::NaiveTime;
use horarium_common::db::models::ValidationStatus;
use horarium_common::schedule::{DayOfWeek, ScheduleEntry};
use std::collections::HashMap;

/// Assign a validation status to an extraction result.
///
/// # Arguments
/// * `confidence` - the accepted tier's confidence score
/// * `tier_threshold` - acceptance threshold of the tier that produced it
/// * `confidence_floor` - global rejection floor
/// * `entries` - candidate schedule entries
/// * `open_reports` - count of unresolved user reports for the parish
pub fn validate(
    confidence: f64,
    tier_threshold: f64,
    confidence_floor: f64,
    entries: &[ScheduleEntry],
    open_reports: i64,
) -> ValidationStatus {
    if confidence < confidence_floor {
        return ValidationStatus::Rejected;
    }
    if has_conflicting_duplicates(entries) {
        return ValidationStatus::Rejected;
    }
    if confidence >= tier_threshold && open_reports == 0 {
        return ValidationStatus::Confirmed;
    }
    ValidationStatus::Pending
}

/// Two entries sharing a (day, time) key with different labels contradict
/// each other; the extraction cannot be trusted as a whole.
fn has_conflicting_duplicates(entries: &[ScheduleEntry]) -> bool {
    let mut seen: HashMap<(DayOfWeek, NaiveTime), &str> = HashMap::new();
    for entry in entries {
        match seen.get(&entry.key()) {
            Some(label) if *label != entry.label => return true,
            _ => {
                seen.insert(entry.key(), &entry.label);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn sunday_mass() -> Vec<ScheduleEntry> {
        vec![ScheduleEntry::new(DayOfWeek::Sunday, t(10, 0), "Sunday Mass")]
    }

    #[test]
    fn test_confidence_below_floor_rejected() {
        let status = validate(0.2, 0.3, 0.3, &sunday_mass(), 0);
        assert_eq!(status, ValidationStatus::Rejected);
    }

    #[test]
    fn test_conflicting_duplicate_keys_rejected() {
        let entries = vec![
            ScheduleEntry::new(DayOfWeek::Sunday, t(10, 0), "Low Mass"),
            ScheduleEntry::new(DayOfWeek::Sunday, t(10, 0), "High Mass"),
        ];
        // High confidence does not save a self-inconsistent extraction
        let status = validate(0.95, 0.9, 0.3, &entries, 0);
        assert_eq!(status, ValidationStatus::Rejected);
    }

    #[test]
    fn test_identical_duplicates_are_not_a_conflict() {
        let entries = vec![
            ScheduleEntry::new(DayOfWeek::Sunday, t(10, 0), "Sunday Mass"),
            ScheduleEntry::new(DayOfWeek::Sunday, t(10, 0), "Sunday Mass"),
        ];
        let status = validate(0.95, 0.9, 0.3, &entries, 0);
        assert_eq!(status, ValidationStatus::Confirmed);
    }

    #[test]
    fn test_clean_confident_extraction_confirmed() {
        let status = validate(0.7, 0.6, 0.3, &sunday_mass(), 0);
        assert_eq!(status, ValidationStatus::Confirmed);
    }

    #[test]
    fn test_open_report_downgrades_to_pending() {
        // Confidence 0.95 would confirm, but an unresolved report blocks it
        let status = validate(0.95, 0.9, 0.3, &sunday_mass(), 1);
        assert_eq!(status, ValidationStatus::Pending);
    }

    #[test]
    fn test_subthreshold_confidence_pends() {
        let status = validate(0.5, 0.6, 0.3, &sunday_mass(), 0);
        assert_eq!(status, ValidationStatus::Pending);
    }

    #[test]
    fn test_same_time_different_days_is_fine() {
        let entries = vec![
            ScheduleEntry::new(DayOfWeek::Saturday, t(10, 0), "Mass"),
            ScheduleEntry::new(DayOfWeek::Sunday, t(10, 0), "Mass"),
        ];
        let status = validate(0.95, 0.9, 0.3, &entries, 0);
        assert_eq!(status, ValidationStatus::Confirmed);
    }
}
