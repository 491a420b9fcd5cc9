//! Tier 3: free-text extraction via an external collaborator
//!
//! Delegates the tag-stripped page text to an opaque text-to-structured-data
//! service. Least trusted tier, used only as last resort. The collaborator
//! is non-deterministic, so a failed call is never retried: a second attempt
//! could return a different, non-reproducible answer. Its self-reported
//! confidence is clamped to a ceiling kept strictly below the tier-1/2
//! range.

use crate::config::ExtractionConfig;
use crate::types::{ExtractError, ExtractResult, TierOutcome};
use horarium_common::schedule::{normalize_entries, parse_time_of_day, ScheduleEntry};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client for the `extract_free_text` collaborator contract
pub struct FreeTextClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    confidence_cap: f64,
}

#[derive(Debug, Serialize)]
struct CollaboratorRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CollaboratorResponse {
    entries: Vec<CollaboratorEntry>,
    confidence: f64,
}

/// Wire shape of one entry as the collaborator reports it.
///
/// Day and time arrive as free strings; anything unparseable is dropped
/// rather than failing the whole response.
#[derive(Debug, Deserialize)]
struct CollaboratorEntry {
    day: String,
    time: String,
    #[serde(default)]
    label: String,
}

impl FreeTextClient {
    /// Build the client when a collaborator endpoint is configured.
    ///
    /// Returns `None` when tier 3 is unconfigured; the orchestrator then
    /// treats tier 3 as unavailable (a tier failure).
    pub fn from_config(config: &ExtractionConfig) -> ExtractResult<Option<Self>> {
        let Some(endpoint) = config.freetext_endpoint.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(config.fetch_connect_timeout_secs))
            .user_agent(horarium_common::config::get_user_agent())
            .build()
            .map_err(|e| ExtractError::Collaborator(format!("HTTP client build failed: {}", e)))?;

        Ok(Some(Self {
            client,
            endpoint,
            api_key: config.freetext_api_key.clone(),
            confidence_cap: config.tier3_confidence_cap,
        }))
    }

    /// `extract_free_text(raw_text) -> (entries, confidence)`
    ///
    /// # Errors
    /// Any transport error, non-2xx status or malformed body is
    /// `ExtractError::Collaborator`, which the orchestrator treats exactly
    /// like any other tier failure.
    pub async fn extract(&self, raw_text: &str) -> ExtractResult<TierOutcome> {
        debug!(endpoint = %self.endpoint, chars = raw_text.len(), "Calling free-text collaborator");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&CollaboratorRequest { text: raw_text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExtractError::Collaborator(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Collaborator(format!(
                "Collaborator returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::Collaborator(format!("Body read failed: {}", e)))?;

        parse_collaborator_response(&body, self.confidence_cap)
    }
}

/// Parse and sanitize a collaborator response body.
///
/// The reported confidence is clamped to `[0, cap]`: over-confident
/// free-text extraction is the failure mode this tier defends against.
fn parse_collaborator_response(body: &str, cap: f64) -> ExtractResult<TierOutcome> {
    let parsed: CollaboratorResponse = serde_json::from_str(body)
        .map_err(|e| ExtractError::Collaborator(format!("Malformed response: {}", e)))?;

    let entries: Vec<ScheduleEntry> = parsed
        .entries
        .iter()
        .filter_map(|e| {
            let day = e.day.parse().ok()?;
            let time = parse_time_of_day(&e.time).ok()?;
            let label = if e.label.trim().is_empty() {
                "Mass".to_string()
            } else {
                e.label.trim().to_string()
            };
            Some(ScheduleEntry::new(day, time, label))
        })
        .collect();

    let confidence = parsed.confidence.clamp(0.0, cap);

    Ok(TierOutcome {
        entries: normalize_entries(entries),
        confidence,
        tier: 3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use horarium_common::schedule::DayOfWeek;

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "entries": [
                {"day": "sunday", "time": "10:00", "label": "Sunday Mass"},
                {"day": "saturday", "time": "5:00 pm", "label": "Vigil"}
            ],
            "confidence": 0.5
        }"#;
        let outcome = parse_collaborator_response(body, 0.55).unwrap();
        assert_eq!(outcome.tier, 3);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.confidence, 0.5);
        assert!(outcome.entries.iter().any(|e| e.day == DayOfWeek::Saturday));
    }

    #[test]
    fn test_overconfident_collaborator_is_clamped() {
        let body = r#"{
            "entries": [{"day": "sunday", "time": "10:00", "label": "Mass"}],
            "confidence": 0.99
        }"#;
        let outcome = parse_collaborator_response(body, 0.55).unwrap();
        assert_eq!(outcome.confidence, 0.55);
    }

    #[test]
    fn test_unparseable_entries_dropped_not_fatal() {
        let body = r#"{
            "entries": [
                {"day": "sunday", "time": "10:00", "label": "Mass"},
                {"day": "the sabbath", "time": "sunrise", "label": "??"}
            ],
            "confidence": 0.4
        }"#;
        let outcome = parse_collaborator_response(body, 0.55).unwrap();
        assert_eq!(outcome.entries.len(), 1);
    }

    #[test]
    fn test_malformed_body_is_collaborator_error() {
        assert!(matches!(
            parse_collaborator_response("not json", 0.55),
            Err(ExtractError::Collaborator(_))
        ));
    }

    #[test]
    fn test_unconfigured_endpoint_disables_tier() {
        let config = ExtractionConfig::default();
        assert!(FreeTextClient::from_config(&config).unwrap().is_none());
    }
}
