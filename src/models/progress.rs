//! Live progress reporting for a running scrape.

use serde::Serialize;

/// Snapshot of scrape progress handed to the caller's sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// 1-based page being scraped; 0 while the session is still being set up.
    pub current_page: u32,
    pub total_pages: u32,
    pub product_count: usize,
    pub status_message: String,
}

impl ProgressEvent {
    pub fn new(
        current_page: u32,
        total_pages: u32,
        product_count: usize,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            current_page,
            total_pages,
            product_count,
            status_message: status_message.into(),
        }
    }
}

/// Receiver of progress events.
///
/// Called synchronously from the page loop, so implementations must return
/// promptly.
pub trait ProgressSink {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent),
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}
