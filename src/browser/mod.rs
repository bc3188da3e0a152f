//! Browser automation capability consumed by the scraper.
//!
//! The scraper only talks to [`BrowserSession`] and [`PageElement`]; concrete
//! sessions come from a [`SessionLauncher`]. Two implementations ship:
//! a chromiumoxide (CDP) session behind the `browser` feature, and a
//! static-HTML snapshot session used for offline extraction and tests.
//!
//! Sessions are driven from a single task and are not `Send`.

pub mod binary;
#[cfg(feature = "browser")]
mod chrome;
pub mod snapshot;
pub(crate) mod stealth;

#[cfg(feature = "browser")]
pub use chrome::{ChromeLauncher, ChromeSession};
pub use snapshot::{SnapshotLauncher, SnapshotSession};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Delay between presence checks in [`BrowserSession::wait_for_any`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors raised by a browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("Timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("Script evaluation failed: {0}")]
    Script(String),
    #[error("Browser protocol error: {0}")]
    Protocol(String),
    #[error("{0}")]
    Unsupported(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Owned handle to an element of the current page.
pub type Element = Box<dyn PageElement>;

/// Operations on a single DOM element.
#[async_trait(?Send)]
pub trait PageElement {
    /// Rendered text of the element and its descendants.
    async fn text(&self) -> BrowserResult<String>;

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>>;

    /// Attribute of the immediate parent element, if there is one.
    async fn parent_attribute(&self, name: &str) -> BrowserResult<Option<String>>;

    /// Descendants matching a CSS selector, in document order.
    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>>;

    async fn is_visible(&self) -> BrowserResult<bool>;

    async fn scroll_into_view(&self) -> BrowserResult<()>;

    /// Simulated user click.
    async fn click(&self) -> BrowserResult<()>;

    /// Programmatic `element.click()` from inside the page.
    async fn dom_click(&self) -> BrowserResult<()>;

    async fn clear(&self) -> BrowserResult<()>;

    async fn type_text(&self, text: &str) -> BrowserResult<()>;

    /// Simulated Enter/Return keystroke.
    async fn press_enter(&self) -> BrowserResult<()>;
}

/// A live browser tab owned by one scrape.
#[async_trait(?Send)]
pub trait BrowserSession {
    /// Navigate and wait for the load, bounded by the page-load timeout.
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    async fn current_url(&self) -> BrowserResult<String>;

    /// Elements of the current page matching a CSS selector.
    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Element>>;

    async fn execute_script(&self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Wait until any of `selectors` matches at least one element.
    ///
    /// Returns `Ok(false)` when the timeout expires; callers decide whether
    /// that matters. Lookup errors count as "not present yet".
    async fn wait_for_any(&self, selectors: &[String], timeout: Duration) -> BrowserResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            for selector in selectors {
                if let Ok(found) = self.find_all(selector).await {
                    if !found.is_empty() {
                        return Ok(true);
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Release the browser. Called exactly once, on every exit path.
    async fn shutdown(&mut self) -> BrowserResult<()>;

    /// Release without awaiting, for a scrape that unwound or was dropped
    /// before [`shutdown`](Self::shutdown) ran. Cleanup that needs the
    /// protocol is handed to the runtime in the background.
    fn abandon(&mut self);
}

/// Acquires a fresh [`BrowserSession`] for one scrape.
#[async_trait(?Send)]
pub trait SessionLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// Stub used when browser support is compiled out.
#[cfg(not(feature = "browser"))]
pub struct ChromeLauncher {
    _config: crate::config::BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromeLauncher {
    pub fn new(config: crate::config::BrowserEngineConfig) -> Self {
        Self { _config: config }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait(?Send)]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        Err(BrowserError::Unsupported(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}
