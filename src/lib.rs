//! catalog-scout - keyword search scraper for e-commerce catalogs.
//!
//! Drives a browser session through a catalog site's search, walks the
//! result pages, and extracts name/price/sold-count records using cascades
//! of fallback selectors that tolerate layout drift.

pub mod browser;
pub mod config;
pub mod models;
pub mod scrape;

pub use browser::{BrowserError, BrowserSession, PageElement, SessionLauncher};
pub use config::Config;
pub use models::{DedupKey, ProductRecord, ProgressEvent, ProgressSink};
pub use scrape::{ScrapeError, ScrapeOutcome, ScrapeRequest, Scraper, TerminationReason};
