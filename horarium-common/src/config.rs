//! Configuration loading and root folder resolution
//!
//! Service configuration resolves through three tiers, highest priority
//! first: database settings table, `HORARIUM_*` environment variables, TOML
//! config file. The root data folder resolves before the database exists, so
//! it only uses environment, TOML, and an OS-dependent default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// TOML configuration file contents (`~/.config/horarium/horarium.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root data folder override
    pub root_folder: Option<String>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Endpoint of the tier-3 free-text extraction collaborator
    pub freetext_endpoint: Option<String>,
    /// API key for the tier-3 collaborator
    pub freetext_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level directive, e.g. "info" or "horarium_se=debug"
    pub level: Option<String>,
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("horarium").join("horarium.toml"))
}

/// Load the TOML config file if present; a missing file yields defaults.
pub fn load_toml_config() -> Result<TomlConfig> {
    let Some(path) = default_config_path() else {
        return Ok(TomlConfig::default());
    };
    load_toml_config_from(&path)
}

/// Load a TOML config from an explicit path (tests use a tempdir)
pub fn load_toml_config_from(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Root folder resolution, priority order:
/// 1. `HORARIUM_ROOT_FOLDER` environment variable
/// 2. `root_folder` in the TOML config file
/// 3. OS-dependent data directory (fallback)
pub struct RootFolderResolver {
    module_name: &'static str,
}

impl RootFolderResolver {
    pub fn new(module_name: &'static str) -> Self {
        Self { module_name }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Ok(path) = std::env::var("HORARIUM_ROOT_FOLDER") {
            info!(module = self.module_name, "Root folder from environment: {}", path);
            return PathBuf::from(path);
        }

        if let Ok(config) = load_toml_config() {
            if let Some(path) = config.root_folder {
                info!(module = self.module_name, "Root folder from TOML config: {}", path);
                return PathBuf::from(path);
            }
        }

        let fallback = dirs::data_local_dir()
            .map(|d| d.join("horarium"))
            .unwrap_or_else(|| PathBuf::from("./horarium_data"));
        info!(
            module = self.module_name,
            "Root folder default: {}",
            fallback.display()
        );
        fallback
    }
}

/// Creates the root folder on first run and derives well-known paths
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Shared SQLite database path inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root.join("horarium.db")
    }
}

/// Standard User-Agent for all outbound HTTP requests.
///
/// Parish hosts see this on every fetch; it identifies the crawler and
/// gives site owners a contact point.
pub fn get_user_agent() -> String {
    format!(
        "Horarium/{} (+https://github.com/horarium/horarium)",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_identifies_project() {
        let ua = get_user_agent();
        assert!(ua.starts_with("Horarium/"));
        assert!(ua.contains("github.com/horarium"));
    }

    #[test]
    fn test_missing_toml_yields_defaults() {
        let config = load_toml_config_from(Path::new("/nonexistent/horarium.toml")).unwrap();
        assert!(config.root_folder.is_none());
        assert!(config.freetext_endpoint.is_none());
    }
}
