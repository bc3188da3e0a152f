use thiserror::Error;

use crate::browser::BrowserError;

/// Failures that end a scrape before any result page was read.
///
/// Everything after the first results page degrades into a
/// [`TerminationReason`](super::TerminationReason) instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Could not start a browser session: {0}")]
    Session(#[source] BrowserError),
    #[error("Could not open {url}: {source}")]
    InitialLoad {
        url: String,
        #[source]
        source: BrowserError,
    },
}

impl ScrapeError {
    /// Suggestion shown to the user next to the error.
    pub fn hint(&self) -> &'static str {
        match self {
            ScrapeError::InvalidRequest(_) => "Check the query and limits, then run again",
            ScrapeError::Session(BrowserError::Unsupported(_)) => {
                "Rebuild with browser support or use `scout extract` on a saved page"
            }
            ScrapeError::Session(_) | ScrapeError::InitialLoad { .. } => {
                "Try again or reduce the number of pages (--pages)"
            }
        }
    }
}
