//! CLI commands implementation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use console::style;

use catalog_scout::browser::{ChromeLauncher, SnapshotSession};
use catalog_scout::scrape::Extractor;
use catalog_scout::{Config, ScrapeRequest, Scraper};

use super::output::{show_outcome, show_products, RenderOptions};
use super::progress::SpinnerProgress;

/// Arguments of `scout search` that override configuration.
pub struct SearchArgs {
    pub query: String,
    pub pages: Option<u32>,
    pub max_results: Option<usize>,
    pub headed: bool,
    pub browser_url: Option<String>,
}

/// Search the live site.
pub async fn cmd_search(
    mut config: Config,
    args: SearchArgs,
    render: &RenderOptions,
) -> anyhow::Result<()> {
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(url) = args.browser_url {
        config.browser.remote_url = Some(url);
    }

    let request = ScrapeRequest::new(
        args.query,
        args.max_results.unwrap_or(config.scrape.max_results),
        args.pages.unwrap_or(config.scrape.max_pages),
    );

    let progress = SpinnerProgress::new();
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        let bar = progress.handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::Relaxed);
                bar.set_message("Stopping after the current page...");
            }
        });
    }

    let scraper = Scraper::from_config(&config).with_cancel_flag(cancel);
    let launcher = ChromeLauncher::new(config.browser.clone());

    match scraper.scrape(&launcher, &request, &progress).await {
        Ok(outcome) => {
            progress.finish(format!(
                "{} Found {} products",
                style("✓").green(),
                outcome.total()
            ));
            show_outcome(&outcome, render)
        }
        Err(e) => {
            progress.clear();
            eprintln!("{} {}", style("✗").red(), e);
            eprintln!("  {} {}", style("→").dim(), e.hint());
            std::process::exit(1);
        }
    }
}

/// Run the extractor over a saved result page.
pub async fn cmd_extract(
    config: &Config,
    file: &Path,
    url: &str,
    render: &RenderOptions,
) -> anyhow::Result<()> {
    let html = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let session = SnapshotSession::from_html(url, &html);
    let products = Extractor::new(&config.site).extract(&session).await;

    if products.is_empty() {
        eprintln!(
            "{} No product containers matched in {}",
            style("!").yellow(),
            file.display()
        );
    }
    show_products(&products, render)
}

/// Print the effective configuration.
pub fn cmd_config(config: &Config) -> anyhow::Result<()> {
    if let Some(ref path) = config.source_path {
        eprintln!("{} Loaded from {}", style("→").dim(), path.display());
    } else {
        eprintln!("{} No config file found, showing defaults", style("→").dim());
    }
    let rendered = config.to_toml().context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
