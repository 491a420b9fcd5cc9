//! Next-occurrence scheduler
//!
//! Computes the next upcoming services across all parishes from each
//! parish's single latest-confirmed record. Timezone-naive by contract:
//! the caller supplies an already-localized `now`.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use horarium_common::schedule::{DayOfWeek, ScheduleEntry};
use serde::Serialize;

/// One upcoming service occurrence
#[derive(Debug, Clone, Serialize)]
pub struct NextOccurrence {
    pub parish_title: String,
    pub day: DayOfWeek,
    #[serde(with = "horarium_common::schedule::time_hm")]
    pub time: NaiveTime,
    pub label: String,
    /// Whole days until the occurrence; 0 = later today, 7 = same weekday
    /// next week
    pub days_ahead: u8,
}

/// Compute the next `limit` occurrences across all candidate schedules.
///
/// For each entry, `days_ahead = (entry.day - now.day + 7) mod 7`; an
/// entry on today's weekday whose time has already passed rolls forward a
/// full week. Results sort by `(days_ahead, time, parish_title)`; the
/// title component only breaks exact ties deterministically.
pub fn next_occurrences(
    schedules: &[(String, Vec<ScheduleEntry>)],
    now: NaiveDateTime,
    limit: usize,
) -> Vec<NextOccurrence> {
    let now_day = DayOfWeek::from(now.weekday());
    // Service times are minute-granular; truncate seconds so "10:00:30"
    // does not push a 10:00 service into next week
    let now_time = NaiveTime::from_hms_opt(now.time().hour(), now.time().minute(), 0)
        .unwrap_or(now.time());

    let mut occurrences: Vec<NextOccurrence> = Vec::new();
    for (parish_title, entries) in schedules {
        for entry in entries {
            let mut days_ahead =
                (entry.day.index0() + 7 - now_day.index0()) % 7;
            if days_ahead == 0 && entry.time <= now_time {
                // Already past today; next occurrence is next week
                days_ahead = 7;
            }
            occurrences.push(NextOccurrence {
                parish_title: parish_title.clone(),
                day: entry.day,
                time: entry.time,
                label: entry.label.clone(),
                days_ahead,
            });
        }
    }

    occurrences.sort_by(|a, b| {
        (a.days_ahead, a.time, &a.parish_title).cmp(&(b.days_ahead, b.time, &b.parish_title))
    });
    occurrences.truncate(limit);
    occurrences
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(day: DayOfWeek, h: u32, m: u32, label: &str) -> ScheduleEntry {
        ScheduleEntry::new(day, NaiveTime::from_hms_opt(h, m, 0).unwrap(), label)
    }

    /// 2026-08-05 is a Wednesday
    fn wednesday_at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_past_entry_today_rolls_to_next_week() {
        // now = Wednesday 10:00, only entry Wednesday 09:00
        let schedules = vec![(
            "St. Mary's".to_string(),
            vec![entry(DayOfWeek::Wednesday, 9, 0, "Mass")],
        )];
        let result = next_occurrences(&schedules, wednesday_at(10, 0), 10);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].days_ahead, 7);
    }

    #[test]
    fn test_later_today_is_zero_days_ahead() {
        let schedules = vec![(
            "St. Mary's".to_string(),
            vec![entry(DayOfWeek::Wednesday, 19, 0, "Evening Mass")],
        )];
        let result = next_occurrences(&schedules, wednesday_at(10, 0), 10);

        assert_eq!(result[0].days_ahead, 0);
    }

    #[test]
    fn test_sort_by_days_ahead_before_time() {
        // From Wednesday: Monday is 5 days ahead, Tuesday is 6... use the
        // spec's shape: an earlier-in-week day further ahead sorts later
        let schedules = vec![
            (
                "Monday Parish".to_string(),
                vec![entry(DayOfWeek::Saturday, 8, 0, "Mass")], // 3 days ahead
            ),
            (
                "Tuesday Parish".to_string(),
                vec![entry(DayOfWeek::Friday, 20, 0, "Mass")], // 2 days ahead
            ),
        ];
        let result = next_occurrences(&schedules, wednesday_at(10, 0), 10);

        // The closer day wins even though its time is later in the day
        assert_eq!(result[0].parish_title, "Tuesday Parish");
        assert_eq!(result[0].days_ahead, 2);
        assert_eq!(result[1].days_ahead, 3);
    }

    #[test]
    fn test_same_day_sorts_by_time() {
        let schedules = vec![
            (
                "A".to_string(),
                vec![entry(DayOfWeek::Thursday, 18, 0, "Evening")],
            ),
            (
                "B".to_string(),
                vec![entry(DayOfWeek::Thursday, 7, 30, "Morning")],
            ),
        ];
        let result = next_occurrences(&schedules, wednesday_at(10, 0), 10);

        assert_eq!(result[0].label, "Morning");
        assert_eq!(result[1].label, "Evening");
    }

    #[test]
    fn test_limit_truncates() {
        let schedules = vec![(
            "Busy Parish".to_string(),
            vec![
                entry(DayOfWeek::Thursday, 7, 0, "a"),
                entry(DayOfWeek::Thursday, 8, 0, "b"),
                entry(DayOfWeek::Thursday, 9, 0, "c"),
            ],
        )];
        let result = next_occurrences(&schedules, wednesday_at(10, 0), 2);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_entry_at_now_exactly_rolls_forward() {
        // "time <= now" is inclusive: a service starting this minute is
        // not "next"
        let schedules = vec![(
            "St. Mary's".to_string(),
            vec![entry(DayOfWeek::Wednesday, 10, 0, "Mass")],
        )];
        let result = next_occurrences(&schedules, wednesday_at(10, 0), 10);
        assert_eq!(result[0].days_ahead, 7);
    }

    #[test]
    fn test_empty_schedules_yield_nothing() {
        let result = next_occurrences(&[], wednesday_at(10, 0), 10);
        assert!(result.is_empty());
    }
}
