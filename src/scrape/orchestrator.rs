//! The scrape state machine: open the site, submit the query, then alternate
//! extraction and pagination until a budget or the listing runs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cascade::{first_found, Attempt};
use super::error::ScrapeError;
use super::extract::Extractor;
use super::pagination::Paginator;
use super::session::{ScrapeOutcome, ScrapeRequest, ScrapeSession, TerminationReason};
use crate::browser::{BrowserResult, BrowserSession, Element, PageElement, SessionLauncher};
use crate::config::{settle, Config, SiteProfile, TimingConfig};
use crate::models::{ProgressEvent, ProgressSink};

/// Owns a launched session until it is shut down.
///
/// Dropping the guard before [`SessionGuard::shutdown`] completed (a panic in
/// a callee, or the caller dropping the scrape future) abandons the session.
struct SessionGuard {
    session: Box<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session,
            released: false,
        }
    }

    fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.session.shutdown().await {
            warn!("Browser shutdown failed: {}", e);
        }
        self.released = true;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!("Scrape ended before the browser was shut down, releasing it");
            self.session.abandon();
        }
    }
}

/// Runs keyword searches against one catalog site.
#[derive(Debug, Clone)]
pub struct Scraper {
    site: SiteProfile,
    timing: TimingConfig,
    progress_every: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl Scraper {
    pub fn new(site: SiteProfile, timing: TimingConfig) -> Self {
        Self {
            site,
            timing,
            progress_every: 5,
            cancel: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.site.clone(), config.timing.clone())
            .with_progress_every(config.scrape.progress_every)
    }

    /// Report the running count every `n` newly added products (0 = never).
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Stop at the next page boundary once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Search for `request.query` and collect products across result pages.
    ///
    /// Errors only when nothing could be scraped at all: an invalid request,
    /// a browser that will not start, or a home page that will not load.
    /// The session is shut down on every path once launched.
    pub async fn scrape(
        &self,
        launcher: &dyn SessionLauncher,
        request: &ScrapeRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        request.validate()?;

        sink.report(ProgressEvent::new(
            0,
            request.max_pages,
            0,
            "Setting up browser...",
        ));
        let session = launcher.launch().await.map_err(ScrapeError::Session)?;
        let mut guard = SessionGuard::new(session);

        // Use inner function to ensure the session is always shut down
        let result = self.scrape_inner(guard.session(), request, sink).await;
        guard.shutdown().await;

        if let Ok(ref outcome) = result {
            info!(
                "Scrape for '{}' finished: {} products from {} pages ({})",
                outcome.query,
                outcome.total(),
                outcome.pages_scraped,
                outcome.termination
            );
        }
        result
    }

    async fn scrape_inner(
        &self,
        session: &dyn BrowserSession,
        request: &ScrapeRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let total_pages = request.max_pages;
        let query = request.query();
        let home = &self.site.base_url;

        sink.report(ProgressEvent::new(
            0,
            total_pages,
            0,
            format!("Opening {}...", home),
        ));
        session
            .navigate(home)
            .await
            .map_err(|source| ScrapeError::InitialLoad {
                url: home.clone(),
                source,
            })?;
        settle(self.timing.home_settle_ms).await;

        sink.report(ProgressEvent::new(
            0,
            total_pages,
            0,
            format!("Searching for '{}'...", query),
        ));
        self.submit_query(session, query, total_pages, sink).await;

        sink.report(ProgressEvent::new(
            1,
            total_pages,
            0,
            "Loading search results...",
        ));
        let ready = session
            .wait_for_any(&self.site.results_ready, self.timing.results_wait())
            .await
            .unwrap_or(false);
        if !ready {
            warn!(
                "Timed out after {}s waiting for search results, continuing",
                self.timing.results_timeout
            );
        }
        settle(self.timing.results_settle_ms).await;

        let mut state = ScrapeSession::new(request);
        let termination = self.page_loop(session, &mut state, sink).await;
        Ok(state.finish(termination))
    }

    /// Type the query into the site's search box, or fall back to the direct
    /// search URL. Never fails; a broken fallback shows up as empty pages.
    async fn submit_query(
        &self,
        session: &dyn BrowserSession,
        query: &str,
        total_pages: u32,
        sink: &dyn ProgressSink,
    ) {
        let submitted = match self.find_search_input(session).await {
            Some(input) => {
                sink.report(ProgressEvent::new(
                    0,
                    total_pages,
                    0,
                    "Entering search query...",
                ));
                match self.type_query(input.as_ref(), query).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Typing into the search box failed: {}", e);
                        false
                    }
                }
            }
            None => {
                debug!("No visible search input found");
                false
            }
        };

        if !submitted {
            let url = self.site.search_url(query);
            sink.report(ProgressEvent::new(
                0,
                total_pages,
                0,
                "Using direct search URL...",
            ));
            if let Err(e) = session.navigate(&url).await {
                warn!("Direct search URL {} failed to load: {}", url, e);
            }
        }
    }

    async fn find_search_input(&self, session: &dyn BrowserSession) -> Option<Element> {
        let wait = self.timing.search_input_wait();
        first_found(&self.site.search_inputs[..], |selector| async move {
            let present = session
                .wait_for_any(std::slice::from_ref(selector), wait)
                .await
                .unwrap_or(false);
            if !present {
                return Attempt::Missing;
            }

            let candidates = match session.find_all(selector).await {
                Ok(candidates) => candidates,
                Err(e) => return Attempt::Failed(e),
            };
            for candidate in candidates {
                if candidate.is_visible().await.unwrap_or(false) {
                    debug!("Search input matched by {}", selector);
                    return Attempt::Found(candidate);
                }
            }
            Attempt::Missing
        })
        .await
        .found()
    }

    async fn type_query(&self, input: &dyn PageElement, query: &str) -> BrowserResult<()> {
        input.clear().await?;
        input.type_text(query).await?;
        settle(self.timing.type_settle_ms).await;
        input.press_enter().await
    }

    async fn page_loop(
        &self,
        session: &dyn BrowserSession,
        state: &mut ScrapeSession,
        sink: &dyn ProgressSink,
    ) -> TerminationReason {
        let extractor = Extractor::new(&self.site);
        let paginator = Paginator::new(session, &self.site, &self.timing);
        let total_pages = state.max_pages();

        loop {
            if self.is_cancelled() {
                info!("Scrape cancelled before page {}", state.current_page());
                return TerminationReason::Cancelled;
            }

            let page = state.current_page();
            sink.report(ProgressEvent::new(
                page,
                total_pages,
                state.product_count(),
                format!("Scraping page {}...", page),
            ));

            let mut added = 0;
            for record in extractor.extract(session).await {
                if !state.admit(record) {
                    continue;
                }
                added += 1;
                let count = state.product_count();
                if self.progress_every > 0 && count % self.progress_every == 0 {
                    sink.report(ProgressEvent::new(
                        page,
                        total_pages,
                        count,
                        format!("Found {} products...", count),
                    ));
                }
            }
            state.page_done();

            info!(
                "Page {}: {} new products ({} total)",
                page,
                added,
                state.product_count()
            );
            sink.report(ProgressEvent::new(
                page,
                total_pages,
                state.product_count(),
                format!("Page {} done: {} new products", page, added),
            ));

            if state.result_budget_reached() {
                return TerminationReason::ResultBudgetReached;
            }
            if state.on_last_page() {
                return TerminationReason::PageBudgetExhausted;
            }
            if self.is_cancelled() {
                info!("Scrape cancelled after page {}", page);
                return TerminationReason::Cancelled;
            }

            match paginator.advance(page).await {
                Ok(Some(_)) => state.next_page(),
                Ok(None) => {
                    info!("No next page after page {}", page);
                    return TerminationReason::NoNextPageFound;
                }
                Err(e) => {
                    warn!("Could not load page {}: {}", page + 1, e);
                    return TerminationReason::NavigationError;
                }
            }
        }
    }
}
