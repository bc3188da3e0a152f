//! Search, extraction, and pagination over a [`BrowserSession`](crate::browser::BrowserSession).

pub mod cascade;
mod error;
pub mod extract;
mod orchestrator;
pub mod pagination;
pub mod patterns;
mod session;

pub use error::ScrapeError;
pub use extract::Extractor;
pub use orchestrator::Scraper;
pub use pagination::{next_page_url, AdvanceStrategy, Paginator};
pub use session::{ScrapeOutcome, ScrapeRequest, ScrapeSession, TerminationReason};
