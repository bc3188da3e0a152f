//! Browser engine configuration types.
//!
//! These live outside `#[cfg(feature = "browser")]` so config parsing and
//! serialization work without the browser feature.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::browser::stealth::DESKTOP_USER_AGENT;

/// Browser engine types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngineType {
    /// chromiumoxide with stealth patches applied after each navigation (default).
    #[default]
    Stealth,

    /// No stealth patches (for debugging).
    Standard,
}

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserEngineConfig {
    /// Browser engine type.
    pub engine: BrowserEngineType,

    /// Run in headless mode (default: true).
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Browser executable. `CHROME_BIN` takes precedence when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Page load timeout in seconds. Exceeding it is a navigation error.
    pub timeout: u64,

    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// User agent presented to the site.
    pub user_agent: String,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngineType::default(),
            headless: true,
            proxy: None,
            chrome_path: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    /// - `BROWSER_PROXY` - Proxy for browser traffic, if none is configured
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("BROWSER_URL").filter(|v| !v.trim().is_empty()) {
            self.remote_url = Some(val.trim().to_string());
        }

        if self.proxy.is_none() {
            if let Some(proxy) = lookup("BROWSER_PROXY").filter(|v| !v.trim().is_empty()) {
                self.proxy = Some(proxy);
            }
        }

        self
    }

    /// Whether this config attaches to an already running browser.
    pub fn is_remote(&self) -> bool {
        self.remote_url.is_some()
    }
}

pub fn default_timeout() -> u64 {
    30
}
