//! Source fetcher
//!
//! Retrieves raw source content for one parish with politeness constraints:
//! a bounded number of concurrent fetches per source host plus a minimum
//! inter-request delay per host, since multiple parishes often share a
//! hosting domain. Transient failures (connect errors, timeouts, 5xx) are
//! retried with exponential backoff; 4xx and empty-but-successful responses
//! fail immediately.

use crate::config::ExtractionConfig;
use crate::types::{ContentKind, ExtractError, ExtractResult, RawContent};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

type HostLimiter = RateLimiter<
    String,
    governor::state::keyed::DefaultKeyedStateStore<String>,
    governor::clock::DefaultClock,
>;

/// HTTP fetcher with per-host politeness
pub struct SourceFetcher {
    client: Client,
    /// Minimum inter-request delay per host, token-bucket enforced
    limiter: Option<HostLimiter>,
    /// Concurrent-fetch cap per host
    host_slots: Mutex<HashMap<String, Arc<Semaphore>>>,
    per_host_concurrency: usize,
    retries: u32,
}

impl SourceFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ExtractionConfig) -> ExtractResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(config.fetch_connect_timeout_secs))
            .user_agent(horarium_common::config::get_user_agent())
            .build()
            .map_err(|e| ExtractError::Fetch(format!("HTTP client build failed: {}", e)))?;

        // One request per delay window per host; a zero delay disables the
        // limiter entirely
        let limiter = if config.per_host_delay_ms > 0 {
            Quota::with_period(Duration::from_millis(config.per_host_delay_ms))
                .map(|q| RateLimiter::keyed(q.allow_burst(NonZeroU32::new(1).expect("1 is non-zero"))))
        } else {
            None
        };

        Ok(Self {
            client,
            limiter,
            host_slots: Mutex::new(HashMap::new()),
            per_host_concurrency: config.per_host_concurrency,
            retries: config.fetch_retries,
        })
    }

    /// Fetch one source page.
    ///
    /// Returns the response body tagged with an inferred content kind: a
    /// body that parses as JSON is treated as a calendar/structured feed,
    /// anything else as HTML.
    pub async fn fetch(&self, url: &str) -> ExtractResult<RawContent> {
        let host = host_of(url)?;

        // Per-host concurrency cap; the permit spans all retry attempts so
        // a slow host is never hammered by a retrying worker pool
        let slot = {
            let mut slots = self.host_slots.lock().await;
            slots
                .entry(host.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_concurrency)))
                .clone()
        };
        let _permit = slot
            .acquire_owned()
            .await
            .map_err(|_| ExtractError::Fetch("Host semaphore closed".to_string()))?;

        let mut attempt = 0u32;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_key_ready(&host).await;
            }

            match self.fetch_once(url).await {
                Ok(body) => return Ok(tag_content(body)),
                Err(failure) => {
                    if failure.retryable && attempt < self.retries {
                        let delay = backoff_delay(attempt);
                        warn!(
                            url = url,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %failure.message,
                            "Transient fetch failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ExtractError::Fetch(failure.message));
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchFailure> {
        debug!(url = url, "Fetching source content");

        let response = self.client.get(url).send().await.map_err(|e| FetchFailure {
            retryable: e.is_timeout() || e.is_connect(),
            message: format!("Request failed: {}", e),
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchFailure {
                retryable: true,
                message: format!("Server error: {}", status),
            });
        }
        if !status.is_success() {
            // 4xx and redirect leftovers are the source's final word
            return Err(FetchFailure {
                retryable: false,
                message: format!("HTTP error: {}", status),
            });
        }

        let body = response.text().await.map_err(|e| FetchFailure {
            retryable: true,
            message: format!("Body read failed: {}", e),
        })?;

        if body.trim().is_empty() {
            return Err(FetchFailure {
                retryable: false,
                message: "Empty response body".to_string(),
            });
        }

        Ok(body)
    }
}

struct FetchFailure {
    retryable: bool,
    message: String,
}

/// Exponential backoff: 500ms base, doubling per attempt
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500u64.saturating_mul(1 << attempt.min(6)))
}

fn host_of(url: &str) -> ExtractResult<String> {
    let parsed =
        Url::parse(url).map_err(|e| ExtractError::Fetch(format!("Invalid source URL: {}", e)))?;
    parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| ExtractError::Fetch(format!("URL has no host: {}", url)))
}

/// Infer the content kind from the body itself.
///
/// Parish sites publish either HTML pages or JSON feeds at their schedule
/// URL; a body that parses as JSON is handed to tier 1 as a feed.
fn tag_content(body: String) -> RawContent {
    let kind = if serde_json::from_str::<serde_json::Value>(body.trim()).is_ok() {
        ContentKind::CalendarFeed
    } else {
        ContentKind::Html
    };
    RawContent { kind, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_extraction_lowercases() {
        assert_eq!(
            host_of("https://StMarys.Example.ORG/mass-times").unwrap(),
            "stmarys.example.org"
        );
        assert!(host_of("not a url").is_err());
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_content_tagging() {
        let feed = tag_content(r#"{"events": []}"#.to_string());
        assert_eq!(feed.kind, ContentKind::CalendarFeed);

        let html = tag_content("<html><body>Mass at 10am</body></html>".to_string());
        assert_eq!(html.kind, ContentKind::Html);
    }
}
