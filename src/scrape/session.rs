//! Per-scrape state and its final snapshot.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ScrapeError;
use crate::models::{DedupKey, ProductRecord};

/// What to search for and how far to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub query: String,
    pub max_results: usize,
    pub max_pages: u32,
}

impl ScrapeRequest {
    pub fn new(query: impl Into<String>, max_results: usize, max_pages: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            max_pages,
        }
    }

    /// Reject requests that could never produce a result.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.query.trim().is_empty() {
            return Err(ScrapeError::InvalidRequest("search query is empty".into()));
        }
        if self.max_results == 0 {
            return Err(ScrapeError::InvalidRequest(
                "max results must be at least 1".into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(ScrapeError::InvalidRequest(
                "page budget must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Query with surrounding whitespace removed.
    pub fn query(&self) -> &str {
        self.query.trim()
    }
}

/// Why the page loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    PageBudgetExhausted,
    ResultBudgetReached,
    NoNextPageFound,
    NavigationError,
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::PageBudgetExhausted => "page budget exhausted",
            TerminationReason::ResultBudgetReached => "result budget reached",
            TerminationReason::NoNextPageFound => "no next page found",
            TerminationReason::NavigationError => "navigation error",
            TerminationReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Mutable state of one running scrape.
#[derive(Debug)]
pub struct ScrapeSession {
    query: String,
    max_results: usize,
    max_pages: u32,
    current_page: u32,
    pages_scraped: u32,
    seen: HashSet<DedupKey>,
    products: Vec<ProductRecord>,
    started_at: DateTime<Utc>,
}

impl ScrapeSession {
    pub fn new(request: &ScrapeRequest) -> Self {
        Self {
            query: request.query().to_string(),
            max_results: request.max_results,
            max_pages: request.max_pages,
            current_page: 1,
            pages_scraped: 0,
            seen: HashSet::new(),
            products: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn result_budget_reached(&self) -> bool {
        self.products.len() >= self.max_results
    }

    pub fn on_last_page(&self) -> bool {
        self.current_page >= self.max_pages
    }

    /// Add `record` unless it was seen before or the result budget is full.
    /// Returns whether it was added.
    pub fn admit(&mut self, record: ProductRecord) -> bool {
        if self.result_budget_reached() {
            return false;
        }
        if !self.seen.insert(record.dedup_key()) {
            return false;
        }
        self.products.push(record);
        true
    }

    pub fn page_done(&mut self) {
        self.pages_scraped += 1;
    }

    pub fn next_page(&mut self) {
        self.current_page += 1;
    }

    pub fn finish(self, termination: TerminationReason) -> ScrapeOutcome {
        ScrapeOutcome {
            query: self.query,
            products: self.products,
            pages_scraped: self.pages_scraped,
            termination,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Everything a finished scrape produced, in first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub query: String,
    pub products: Vec<ProductRecord>,
    pub pages_scraped: u32,
    pub termination: TerminationReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScrapeOutcome {
    pub fn total(&self) -> usize {
        self.products.len()
    }

    /// Products with a usable price; every admitted record has one.
    pub fn with_price(&self) -> usize {
        self.products.iter().filter(|p| !p.price.is_empty()).count()
    }

    pub fn with_sold_count(&self) -> usize {
        self.products.iter().filter(|p| p.has_sold_count()).count()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
