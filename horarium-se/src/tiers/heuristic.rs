//! Tier 2: heuristic HTML extraction
//!
//! Scans the tag-stripped page text line by line for day-of-week anchors
//! with adjacent clock times. Layout-free by design: parish sites publish
//! schedules as tables, lists and prose, and all of those collapse to
//! "day ... time" lines once tags are gone. Moderately trusted; the
//! confidence reflects how many day-anchored lines actually parsed.

use crate::tiers::html_to_text;
use crate::types::{ContentKind, ExtractError, ExtractResult, RawContent, TierOutcome};
use chrono::NaiveTime;
use horarium_common::schedule::{normalize_entries, parse_time_of_day, DayOfWeek, ScheduleEntry};
use tracing::debug;

/// Confidence when every day-anchored line parses
const BASE_CONFIDENCE: f64 = 0.75;

const DEFAULT_LABEL: &str = "Mass";

/// Words skipped when rebuilding a label from the residual line text
const FILLER_WORDS: &[&str] = &["&", "and", "at", "-", "–", "|"];

pub fn extract(content: &RawContent) -> ExtractResult<TierOutcome> {
    if content.kind == ContentKind::CalendarFeed {
        return Err(ExtractError::Parse(
            "Feed content has no page layout to scan".to_string(),
        ));
    }
    scan_text(&html_to_text(&content.body))
}

/// Scan plain text lines for schedule entries.
///
/// Split out from `extract` so tests can drive it with raw text.
pub(crate) fn scan_text(text: &str) -> ExtractResult<TierOutcome> {
    let mut entries: Vec<ScheduleEntry> = Vec::new();
    let mut day_lines = 0usize;
    let mut parsed_lines = 0usize;

    for line in text.lines() {
        let scanned = scan_line(line);
        if scanned.days.is_empty() {
            continue;
        }
        day_lines += 1;
        if scanned.times.is_empty() {
            continue;
        }
        parsed_lines += 1;

        let label = if scanned.label.is_empty() {
            DEFAULT_LABEL.to_string()
        } else {
            scanned.label
        };
        for day in &scanned.days {
            for time in &scanned.times {
                entries.push(ScheduleEntry::new(*day, *time, label.clone()));
            }
        }
    }

    if day_lines == 0 {
        return Err(ExtractError::Parse(
            "No day-of-week anchors in page text".to_string(),
        ));
    }
    if entries.is_empty() {
        return Err(ExtractError::Parse(
            "Day anchors present but no parseable times".to_string(),
        ));
    }

    // Unparsed day-anchored lines are schedule rows we failed to read, so
    // they lower trust in the ones we did read
    let confidence = BASE_CONFIDENCE * (parsed_lines as f64) / (day_lines as f64);

    debug!(
        day_lines = day_lines,
        parsed_lines = parsed_lines,
        entries = entries.len(),
        confidence = confidence,
        "Heuristic extraction complete"
    );

    Ok(TierOutcome {
        entries: normalize_entries(entries),
        confidence,
        tier: 2,
    })
}

struct ScannedLine {
    days: Vec<DayOfWeek>,
    times: Vec<NaiveTime>,
    label: String,
}

fn scan_line(line: &str) -> ScannedLine {
    let words: Vec<&str> = line.split_whitespace().collect();
    let mut days = Vec::new();
    let mut times = Vec::new();
    let mut residual: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < words.len() {
        let cleaned = clean_word(words[i]);

        if let Ok(day) = cleaned.parse::<DayOfWeek>() {
            if !days.contains(&day) {
                days.push(day);
            }
            i += 1;
            continue;
        }

        if let Some((time, consumed)) = parse_time_words(cleaned, words.get(i + 1)) {
            if !times.contains(&time) {
                times.push(time);
            }
            i += consumed;
            continue;
        }

        if !FILLER_WORDS.contains(&cleaned.to_ascii_lowercase().as_str()) && !cleaned.is_empty() {
            residual.push(words[i]);
        }
        i += 1;
    }

    ScannedLine {
        days,
        times,
        label: clean_label(&residual.join(" ")),
    }
}

fn clean_word(word: &str) -> &str {
    word.trim_matches([',', '.', ';', ':', '(', ')', '*'])
}

/// Try to read a clock time starting at `word`.
///
/// Returns the parsed time and how many words were consumed (2 when a bare
/// "10:30" is followed by a detached "am"/"pm"). Bare integers only count
/// as times when a meridiem follows; "7 parishes" must not become 07:00.
fn parse_time_words(word: &str, next: Option<&&str>) -> Option<(NaiveTime, usize)> {
    if word.is_empty() || !word.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let lower = word.to_ascii_lowercase();
    if lower.ends_with("am") || lower.ends_with("pm") {
        return parse_time_of_day(&lower).ok().map(|t| (t, 1));
    }

    let next_meridiem = next
        .map(|w| clean_word(w).to_ascii_lowercase())
        .filter(|w| w == "am" || w == "pm");

    if let Some(meridiem) = next_meridiem {
        return parse_time_of_day(&format!("{} {}", lower, meridiem))
            .ok()
            .map(|t| (t, 2));
    }

    // Without a meridiem only explicit "HH:MM" forms qualify
    if lower.contains(':') {
        return parse_time_of_day(&lower).ok().map(|t| (t, 1));
    }
    None
}

fn clean_label(raw: &str) -> String {
    raw.trim_matches([' ', ',', '-', ':', '|']).to_string()
}
