//! Configuration management for catalog-scout.
//!
//! A config file is optional. An explicit path wins; otherwise `prefer`
//! discovers a `catalog-scout` config file in its standard locations, and
//! built-in defaults apply when none exists. Environment overrides are
//! applied last.

mod browser;
mod site;

pub use browser::{BrowserEngineConfig, BrowserEngineType};
pub use site::{SiteProfile, QUERY_PLACEHOLDER};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name `prefer` uses to discover config files.
pub const APP_NAME: &str = "catalog-scout";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported config format '{0}' (use .toml or .json)")]
    UnsupportedFormat(String),
}

/// Limits applied to a scrape when the caller does not pass its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Stop once this many unique products are collected.
    pub max_results: usize,
    /// Result pages visited per scrape.
    pub max_pages: u32,
    /// Emit a progress update every N newly added products (0 = never).
    pub progress_every: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            max_results: 1000,
            max_pages: 2,
            progress_every: 5,
        }
    }
}

/// Bounded waits (seconds) and settle pauses (milliseconds).
///
/// Every wait here is soft: expiry is logged and the scrape carries on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub search_input_timeout: u64,
    pub results_timeout: u64,
    pub next_page_timeout: u64,
    /// After opening the home page.
    pub home_settle_ms: u64,
    /// Between typing the query and pressing Enter.
    pub type_settle_ms: u64,
    /// After the first result page rendered.
    pub results_settle_ms: u64,
    /// After scrolling, before looking for or clicking a control.
    pub scroll_settle_ms: u64,
    /// After a pagination advance, before waiting for results.
    pub advance_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            search_input_timeout: 5,
            results_timeout: 15,
            next_page_timeout: 15,
            home_settle_ms: 2000,
            type_settle_ms: 1000,
            results_settle_ms: 2000,
            scroll_settle_ms: 1500,
            advance_settle_ms: 3000,
        }
    }
}

impl TimingConfig {
    /// No waiting at all; for snapshot sessions where nothing renders late.
    pub fn immediate() -> Self {
        Self {
            search_input_timeout: 0,
            results_timeout: 0,
            next_page_timeout: 0,
            home_settle_ms: 0,
            type_settle_ms: 0,
            results_settle_ms: 0,
            scroll_settle_ms: 0,
            advance_settle_ms: 0,
        }
    }

    pub fn search_input_wait(&self) -> Duration {
        Duration::from_secs(self.search_input_timeout)
    }

    pub fn results_wait(&self) -> Duration {
        Duration::from_secs(self.results_timeout)
    }

    pub fn next_page_wait(&self) -> Duration {
        Duration::from_secs(self.next_page_timeout)
    }
}

/// Sleep for a settle pause; zero returns immediately.
pub async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserEngineConfig,
    pub site: SiteProfile,
    pub scrape: ScrapeSettings,
    pub timing: TimingConfig,
    /// File this config was read from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, discovering a file when `path` is `None`.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from_path(path).await?,
            None => match Self::discover().await {
                Some(found) => Self::load_from_path(&found).await?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        Ok(config.with_env_overrides())
    }

    /// Load configuration from a specific file path (TOML or JSON by extension).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Find a config file with prefer; its parsed value is discarded and the
    /// file is re-read through serde.
    async fn discover() -> Option<PathBuf> {
        match prefer::load(APP_NAME).await {
            Ok(found) => found.source_path().map(|p| p.to_path_buf()),
            Err(e) => {
                debug!("prefer found no {} config: {}", APP_NAME, e);
                None
            }
        }
    }

    /// Apply environment variable overrides to every section that has them.
    pub fn with_env_overrides(mut self) -> Self {
        self.browser = self.browser.with_env_overrides();
        self
    }

    /// Render as TOML (for `scout config`).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
