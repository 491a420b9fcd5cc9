//! Diff engine
//!
//! Compares two consecutive confirmed extraction records and classifies the
//! delta. Identity key is (day, time); the label is payload, so a label
//! change on an existing key is a modification, never a remove+add pair.
//!
//! Diffing always runs against the previous *confirmed* record, never an
//! intervening pending/rejected one, so the audit trail reflects only
//! changes that became publicly visible. Keys inside one confirmed record
//! are unique (validation rejects conflicting duplicates), so no duplicate
//! handling is needed here.

use chrono::NaiveTime;
use horarium_common::db::models::{ChangeType, ModifiedEntry, ScheduleDiff};
use horarium_common::schedule::{DayOfWeek, ScheduleEntry};
use std::collections::BTreeMap;

/// Compute the delta between the previous confirmed entry set and the new
/// one. `previous = None` means no confirmed record existed before.
pub fn diff_schedules(
    previous: Option<&[ScheduleEntry]>,
    new: &[ScheduleEntry],
) -> (ChangeType, ScheduleDiff) {
    let Some(previous) = previous else {
        return (
            ChangeType::AddedInitial,
            ScheduleDiff {
                added: new.to_vec(),
                ..Default::default()
            },
        );
    };

    let prev_map = key_map(previous);
    let new_map = key_map(new);

    let mut diff = ScheduleDiff::default();

    for (key, entry) in &new_map {
        match prev_map.get(key) {
            None => diff.added.push((*entry).clone()),
            Some(before) if before.label != entry.label => diff.modified.push(ModifiedEntry {
                before: (*before).clone(),
                after: (*entry).clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, entry) in &prev_map {
        if !new_map.contains_key(key) {
            diff.removed.push((*entry).clone());
        }
    }

    (classify(&diff), diff)
}

fn key_map(entries: &[ScheduleEntry]) -> BTreeMap<(DayOfWeek, NaiveTime), &ScheduleEntry> {
    entries.iter().map(|e| (e.key(), e)).collect()
}

fn classify(diff: &ScheduleDiff) -> ChangeType {
    let kinds = [
        !diff.added.is_empty(),
        !diff.removed.is_empty(),
        !diff.modified.is_empty(),
    ];
    match kinds.iter().filter(|k| **k).count() {
        0 => ChangeType::NoChange,
        1 if kinds[0] => ChangeType::Added,
        1 if kinds[1] => ChangeType::Removed,
        1 => ChangeType::Modified,
        _ => ChangeType::Mixed,
    }
}
