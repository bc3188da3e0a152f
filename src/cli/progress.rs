//! Spinner that renders scrape progress events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use catalog_scout::{ProgressEvent, ProgressSink};

/// Single-line spinner on stderr, so stdout stays clean for results.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{prefix}] {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("-/-");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Handle for updating the spinner from another task.
    pub fn handle(&self) -> ProgressBar {
        self.bar.clone()
    }

    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }

    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for SpinnerProgress {
    fn report(&self, event: ProgressEvent) {
        if event.current_page > 0 {
            self.bar
                .set_prefix(format!("{}/{}", event.current_page, event.total_pages));
        }
        if event.product_count > 0 {
            self.bar.set_message(format!(
                "{} ({} products)",
                event.status_message, event.product_count
            ));
        } else {
            self.bar.set_message(event.status_message);
        }
    }
}
