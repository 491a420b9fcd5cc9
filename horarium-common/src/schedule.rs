//! Schedule domain types: days of week, service times, schedule entries
//!
//! A schedule entry is one `{day, time, label}` tuple within an extraction.
//! The identity of an entry is its `(day, time)` key; the label is payload.
//! All services share these types so extraction, validation, diffing and the
//! read queries agree on identity and ordering.

use crate::{Error, Result};
use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Day of week, Monday-based.
///
/// Ordering follows the civil week (Monday < ... < Sunday), matching
/// chrono's `Weekday::num_days_from_monday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Zero-based index with Monday = 0, Sunday = 6
    pub fn index0(self) -> u8 {
        self as u8
    }

    /// Human-readable label ("Monday", ...)
    pub fn label(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    /// Construct from a zero-based Monday index (wraps modulo 7)
    pub fn from_index0(index: u8) -> DayOfWeek {
        Self::ALL[(index % 7) as usize]
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        Self::from_index0(w.num_days_from_monday() as u8)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DayOfWeek {
    type Err = Error;

    /// Parses full names and 3-letter abbreviations, case-insensitive
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        // Trailing plural/punctuation forms: "Sundays", "Mon.", "Wed:"
        let token = lowered.trim_end_matches(['.', ':', 's']);
        let day = match token {
            "monday" | "mon" => DayOfWeek::Monday,
            "tuesday" | "tue" | "tues" => DayOfWeek::Tuesday,
            "wednesday" | "wed" => DayOfWeek::Wednesday,
            "thursday" | "thu" | "thur" | "thurs" => DayOfWeek::Thursday,
            "friday" | "fri" => DayOfWeek::Friday,
            "saturday" | "sat" => DayOfWeek::Saturday,
            "sunday" | "sun" => DayOfWeek::Sunday,
            _ => return Err(Error::InvalidInput(format!("Unrecognized day of week: {}", s))),
        };
        Ok(day)
    }
}

/// Parse a time-of-day string in the forms found on parish pages.
///
/// Accepted: "09:30", "9:30", "19:30:00", "9:30 am", "7 pm", "12pm".
/// Seconds are discarded; service times are minute-granular.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let raw = s.trim().to_ascii_lowercase();

    // Split a trailing am/pm marker off the numeric part
    let (numeric, meridiem) = if let Some(stripped) = raw.strip_suffix("am") {
        (stripped.trim_end_matches([' ', '.']).to_string(), Some(false))
    } else if let Some(stripped) = raw.strip_suffix("pm") {
        (stripped.trim_end_matches([' ', '.']).to_string(), Some(true))
    } else {
        (raw.clone(), None)
    };

    let mut parts = numeric.split(':');
    let hour_part = parts
        .next()
        .ok_or_else(|| Error::InvalidInput(format!("Empty time: {}", s)))?;
    let hour: u32 = hour_part
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Unparseable time: {}", s)))?;
    let minute: u32 = match parts.next() {
        Some(m) => m
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Unparseable time: {}", s)))?,
        None => 0,
    };
    // A third component (seconds) is tolerated and dropped

    let hour = match meridiem {
        Some(true) if hour < 12 => hour + 12,
        Some(false) if hour == 12 => 0,
        _ => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| Error::InvalidInput(format!("Time out of range: {}", s)))
}

/// Format a time-of-day as "HH:MM" (the canonical wire/storage form)
pub fn format_time_of_day(t: NaiveTime) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

/// Serde adapter storing `NaiveTime` as "HH:MM"
pub mod time_hm {
    use super::{format_time_of_day, parse_time_of_day};
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, ser: S) -> std::result::Result<S::Ok, S::Error> {
        ser.serialize_str(&format_time_of_day(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<NaiveTime, D::Error> {
        let s = String::deserialize(de)?;
        parse_time_of_day(&s).map_err(serde::de::Error::custom)
    }
}

/// One service time within an extraction: `{day, time, label}`
///
/// Entries are ordered by `(day, time, label)`; two entries with the same
/// `(day, time)` key but different labels are a conflict that the validation
/// engine rejects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: DayOfWeek,
    #[serde(with = "time_hm")]
    pub time: NaiveTime,
    pub label: String,
}

impl ScheduleEntry {
    pub fn new(day: DayOfWeek, time: NaiveTime, label: impl Into<String>) -> Self {
        Self {
            day,
            time,
            label: label.into(),
        }
    }

    /// Identity key: `(day, time)`. The label is payload, not identity.
    pub fn key(&self) -> (DayOfWeek, NaiveTime) {
        (self.day, self.time)
    }
}

impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.day, self.time, &self.label).cmp(&(other.day, other.time, &other.label))
    }
}

/// Sort entries into canonical order and drop exact duplicates.
///
/// Entries sharing a `(day, time)` key but differing in label are kept:
/// detecting that conflict is the validation engine's job, not the parser's.
pub fn normalize_entries(mut entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
    entries.sort();
    entries.dedup();
    entries
}
