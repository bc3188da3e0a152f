//! scout - keyword search scraper for e-commerce catalogs.
//!
//! Searches a catalog site through a real browser and prints the products
//! found across the result pages.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // RUST_LOG wins over the -v default
    let default_filter = if cli::is_verbose() {
        "catalog_scout=info,scout=info"
    } else {
        "catalog_scout=warn,scout=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::run().await
}
