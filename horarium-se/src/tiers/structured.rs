//! Tier 1: structured data extraction
//!
//! Parses schema.org JSON-LD blocks embedded in the page (or a raw JSON
//! feed body) into schedule entries. No inference happens here: a result
//! only exists when the source itself published machine-readable day/time
//! data, which is why this tier is trusted almost outright.

use crate::types::{ContentKind, ExtractError, ExtractResult, RawContent, TierOutcome};
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Weekday};
use horarium_common::schedule::{normalize_entries, parse_time_of_day, DayOfWeek, ScheduleEntry};
use serde_json::Value;
use tracing::debug;

/// Base confidence when every structured candidate parsed cleanly
const FULL_CONFIDENCE: f64 = 0.95;

/// Default service label when the source names nothing
const DEFAULT_LABEL: &str = "Mass";

/// Extract schedule entries from structured data.
///
/// # Errors
/// `ExtractError::Parse` when the content carries no structured schedule
/// data at all; the orchestrator escalates to tier 2.
pub fn extract(content: &RawContent) -> ExtractResult<TierOutcome> {
    let documents = match content.kind {
        ContentKind::CalendarFeed => {
            let value: Value = serde_json::from_str(content.body.trim())
                .map_err(|e| ExtractError::Parse(format!("Feed body is not JSON: {}", e)))?;
            vec![value]
        }
        ContentKind::Html => {
            let (parsed, malformed_blocks) = json_ld_blocks(&content.body);
            if parsed.is_empty() && malformed_blocks == 0 {
                return Err(ExtractError::Parse(
                    "No JSON-LD blocks in document".to_string(),
                ));
            }
            parsed
        }
    };

    let mut scan = Scan::default();
    for doc in &documents {
        walk(doc, None, &mut scan);
    }

    if scan.entries.is_empty() {
        return Err(ExtractError::Parse(
            "Structured data contains no schedule candidates".to_string(),
        ));
    }

    // Malformed candidates dilute trust proportionally
    let total = (scan.parsed + scan.malformed) as f64;
    let confidence = FULL_CONFIDENCE * (scan.parsed as f64) / total;

    debug!(
        parsed = scan.parsed,
        malformed = scan.malformed,
        confidence = confidence,
        "Structured data extraction complete"
    );

    Ok(TierOutcome {
        entries: normalize_entries(scan.entries),
        confidence,
        tier: 1,
    })
}

#[derive(Default)]
struct Scan {
    entries: Vec<ScheduleEntry>,
    parsed: usize,
    malformed: usize,
}

/// Collect parsed `<script type="application/ld+json">` payloads.
///
/// Returns the parsed documents and the count of blocks whose JSON failed
/// to parse (those still prove the page intended structured data).
fn json_ld_blocks(html: &str) -> (Vec<Value>, usize) {
    let lower = html.to_ascii_lowercase();
    let mut parsed = Vec::new();
    let mut malformed = 0;
    let mut pos = 0;

    while let Some(start_rel) = lower[pos..].find("<script") {
        let start = pos + start_rel;
        let Some(tag_end_rel) = lower[start..].find('>') else {
            break;
        };
        let tag = &lower[start..start + tag_end_rel];
        let body_start = start + tag_end_rel + 1;
        let Some(close_rel) = lower[body_start..].find("</script") else {
            break;
        };
        if tag.contains("ld+json") {
            match serde_json::from_str::<Value>(html[body_start..body_start + close_rel].trim()) {
                Ok(value) => parsed.push(value),
                Err(_) => malformed += 1,
            }
        }
        pos = body_start + close_rel + 1;
    }

    (parsed, malformed)
}

/// Recursive walk over a JSON-LD document.
///
/// Two candidate shapes produce entries:
/// - Schedule objects: `{"byDay": [...], "startTime": "10:00"}`
/// - Event objects: `{"@type": "Event", "startDate": "2026-08-09T10:00:00"}`
///
/// `name` is inherited downward so a named event's nested schedule keeps
/// its label.
fn walk(value: &Value, name: Option<&str>, scan: &mut Scan) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, name, scan);
            }
        }
        Value::Object(obj) => {
            let own_name = obj.get("name").and_then(Value::as_str).or(name);

            if obj.contains_key("byDay") && obj.contains_key("startTime") {
                match parse_schedule_object(obj, own_name) {
                    Some(mut entries) => {
                        scan.parsed += 1;
                        scan.entries.append(&mut entries);
                    }
                    None => scan.malformed += 1,
                }
                return;
            }

            let is_event = obj
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("Event"));
            if is_event && obj.contains_key("startDate") {
                match parse_event_object(obj, own_name) {
                    Some(entry) => {
                        scan.parsed += 1;
                        scan.entries.push(entry);
                    }
                    None => scan.malformed += 1,
                }
                // An event may also carry a nested eventSchedule
                if let Some(schedule) = obj.get("eventSchedule") {
                    walk(schedule, own_name, scan);
                }
                return;
            }

            for child in obj.values() {
                walk(child, own_name, scan);
            }
        }
        _ => {}
    }
}

fn parse_schedule_object(
    obj: &serde_json::Map<String, Value>,
    name: Option<&str>,
) -> Option<Vec<ScheduleEntry>> {
    let time = parse_time_of_day(obj.get("startTime")?.as_str()?).ok()?;
    let label = name.unwrap_or(DEFAULT_LABEL).trim().to_string();

    let days: Vec<DayOfWeek> = match obj.get("byDay")? {
        Value::String(s) => vec![parse_schema_day(s)?],
        Value::Array(items) => items
            .iter()
            .map(|d| d.as_str().and_then(parse_schema_day))
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    if days.is_empty() {
        return None;
    }

    Some(
        days.into_iter()
            .map(|day| ScheduleEntry::new(day, time, label.clone()))
            .collect(),
    )
}

/// Accepts "Sunday" as well as the canonical "https://schema.org/Sunday"
fn parse_schema_day(raw: &str) -> Option<DayOfWeek> {
    raw.rsplit('/').next()?.parse().ok()
}

fn parse_event_object(
    obj: &serde_json::Map<String, Value>,
    name: Option<&str>,
) -> Option<ScheduleEntry> {
    let start = obj.get("startDate")?.as_str()?;
    let (weekday, time) = parse_start_date(start)?;
    Some(ScheduleEntry::new(
        weekday.into(),
        time,
        name.unwrap_or(DEFAULT_LABEL).trim().to_string(),
    ))
}

fn parse_start_date(raw: &str) -> Option<(Weekday, NaiveTime)> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some((dt.weekday(), dt.time()));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some((dt.weekday(), dt.time()));
        }
    }
    None
}
