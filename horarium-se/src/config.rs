//! Extraction configuration resolution
//!
//! Every threshold and politeness limit resolves through three tiers,
//! highest priority first: database settings table -> `HORARIUM_*`
//! environment variable -> compiled default. The tier-3 collaborator
//! endpoint additionally falls back to the TOML config file, since it must
//! be configurable before the database exists.

use horarium_common::config::TomlConfig;
use horarium_common::db::settings::get_setting;
use horarium_common::Result;
use sqlx::SqlitePool;
use tracing::warn;

/// Runtime configuration for the extraction pipeline.
///
/// Acceptance thresholds are per-tier: a tier succeeds only when it returns
/// a non-empty entry list with confidence at or above its threshold.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Tier 1 (structured data) acceptance threshold
    pub tier1_threshold: f64,
    /// Tier 2 (heuristic HTML) acceptance threshold
    pub tier2_threshold: f64,
    /// Tier 3 (free-text collaborator) acceptance threshold
    pub tier3_threshold: f64,
    /// Below this confidence a result is rejected outright by validation
    pub confidence_floor: f64,
    /// Ceiling applied to the tier-3 collaborator's self-reported
    /// confidence, kept strictly below the tier-1/2 range
    pub tier3_confidence_cap: f64,
    /// Bounded worker pool size for batch extraction
    pub worker_pool_size: usize,
    /// Maximum concurrent fetches against one source host
    pub per_host_concurrency: usize,
    /// Minimum delay between requests to one source host (milliseconds)
    pub per_host_delay_ms: u64,
    /// Total per-fetch timeout (seconds)
    pub fetch_timeout_secs: u64,
    /// Connection timeout (seconds)
    pub fetch_connect_timeout_secs: u64,
    /// Retries for transient fetch failures (connect errors, 5xx)
    pub fetch_retries: u32,
    /// Minutes between scheduled full batches
    pub batch_interval_minutes: u64,
    /// Tier-3 collaborator endpoint; tier 3 is skipped when unset
    pub freetext_endpoint: Option<String>,
    /// Tier-3 collaborator API key
    pub freetext_api_key: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tier1_threshold: 0.9,
            tier2_threshold: 0.6,
            tier3_threshold: 0.3,
            confidence_floor: 0.3,
            tier3_confidence_cap: 0.55,
            worker_pool_size: 4,
            per_host_concurrency: 2,
            per_host_delay_ms: 1000,
            fetch_timeout_secs: 15,
            fetch_connect_timeout_secs: 5,
            fetch_retries: 2,
            batch_interval_minutes: 360,
            freetext_endpoint: None,
            freetext_api_key: None,
        }
    }
}

impl ExtractionConfig {
    /// Resolve configuration from database settings, environment and TOML.
    pub async fn load(db: &SqlitePool, toml_config: &TomlConfig) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            tier1_threshold: resolve_f64(
                db,
                "extraction.tier1_threshold",
                "HORARIUM_TIER1_THRESHOLD",
                defaults.tier1_threshold,
            )
            .await?,
            tier2_threshold: resolve_f64(
                db,
                "extraction.tier2_threshold",
                "HORARIUM_TIER2_THRESHOLD",
                defaults.tier2_threshold,
            )
            .await?,
            tier3_threshold: resolve_f64(
                db,
                "extraction.tier3_threshold",
                "HORARIUM_TIER3_THRESHOLD",
                defaults.tier3_threshold,
            )
            .await?,
            confidence_floor: resolve_f64(
                db,
                "extraction.confidence_floor",
                "HORARIUM_CONFIDENCE_FLOOR",
                defaults.confidence_floor,
            )
            .await?,
            tier3_confidence_cap: resolve_f64(
                db,
                "extraction.tier3_confidence_cap",
                "HORARIUM_TIER3_CONFIDENCE_CAP",
                defaults.tier3_confidence_cap,
            )
            .await?,
            worker_pool_size: resolve_u64(
                db,
                "extraction.worker_pool_size",
                "HORARIUM_WORKER_POOL_SIZE",
                defaults.worker_pool_size as u64,
            )
            .await? as usize,
            per_host_concurrency: resolve_u64(
                db,
                "extraction.per_host_concurrency",
                "HORARIUM_PER_HOST_CONCURRENCY",
                defaults.per_host_concurrency as u64,
            )
            .await?
            .max(1) as usize,
            per_host_delay_ms: resolve_u64(
                db,
                "extraction.per_host_delay_ms",
                "HORARIUM_PER_HOST_DELAY_MS",
                defaults.per_host_delay_ms,
            )
            .await?,
            fetch_timeout_secs: resolve_u64(
                db,
                "extraction.fetch_timeout_secs",
                "HORARIUM_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            )
            .await?,
            fetch_connect_timeout_secs: resolve_u64(
                db,
                "extraction.fetch_connect_timeout_secs",
                "HORARIUM_FETCH_CONNECT_TIMEOUT_SECS",
                defaults.fetch_connect_timeout_secs,
            )
            .await?,
            fetch_retries: resolve_u64(
                db,
                "extraction.fetch_retries",
                "HORARIUM_FETCH_RETRIES",
                defaults.fetch_retries as u64,
            )
            .await? as u32,
            batch_interval_minutes: resolve_u64(
                db,
                "extraction.batch_interval_minutes",
                "HORARIUM_BATCH_INTERVAL_MINUTES",
                defaults.batch_interval_minutes,
            )
            .await?
            .max(1),
            freetext_endpoint: resolve_string(
                db,
                "extraction.freetext_endpoint",
                "HORARIUM_FREETEXT_ENDPOINT",
            )
            .await?
            .or_else(|| toml_config.freetext_endpoint.clone()),
            freetext_api_key: resolve_string(
                db,
                "extraction.freetext_api_key",
                "HORARIUM_FREETEXT_API_KEY",
            )
            .await?
            .or_else(|| toml_config.freetext_api_key.clone()),
        };

        Ok(config)
    }
}

async fn resolve_string(
    db: &SqlitePool,
    setting_key: &str,
    env_key: &str,
) -> Result<Option<String>> {
    if let Some(value) = get_setting(db, setting_key).await? {
        if !value.trim().is_empty() {
            return Ok(Some(value));
        }
    }
    if let Ok(value) = std::env::var(env_key) {
        if !value.trim().is_empty() {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

async fn resolve_f64(db: &SqlitePool, setting_key: &str, env_key: &str, default: f64) -> Result<f64> {
    match resolve_string(db, setting_key, env_key).await? {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(
                    key = setting_key,
                    value = %raw,
                    "Unparseable numeric setting, using default {}",
                    default
                );
                Ok(default)
            }
        },
        None => Ok(default),
    }
}

async fn resolve_u64(db: &SqlitePool, setting_key: &str, env_key: &str, default: u64) -> Result<u64> {
    match resolve_string(db, setting_key, env_key).await? {
        Some(raw) => match raw.parse::<u64>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(
                    key = setting_key,
                    value = %raw,
                    "Unparseable numeric setting, using default {}",
                    default
                );
                Ok(default)
            }
        },
        None => Ok(default),
    }
}
