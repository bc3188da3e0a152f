//! Command-line interface for catalog-scout.

mod commands;
mod output;
mod progress;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use catalog_scout::Config;

pub use output::{OutputFormat, RenderOptions};

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Keyword search scraper for e-commerce catalogs")]
#[command(version)]
pub struct Cli {
    /// Config file (.toml or .json)
    #[arg(long, global = true, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog and list matching products
    Search {
        /// Search keywords
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Result pages to scrape, 1-10 (default from config)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=10))]
        pages: Option<u32>,
        /// Stop after this many unique products (default from config)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Only show products whose name contains this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Attach to a running browser (e.g. ws://localhost:9222)
        #[arg(long)]
        browser_url: Option<String>,
    },

    /// Extract products from a saved result page
    Extract {
        /// HTML file captured from a result page
        file: PathBuf,
        /// Address the page was captured from, for resolving relative links
        #[arg(long, default_value = "https://www.daraz.com.np/catalog/")]
        url: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Only show products whose name contains this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Search {
            query,
            pages,
            max_results,
            format,
            filter,
            output,
            headed,
            browser_url,
        } => {
            let render = RenderOptions {
                format,
                filter,
                output,
            };
            let search = commands::SearchArgs {
                query: query.join(" "),
                pages,
                max_results,
                headed,
                browser_url,
            };
            commands::cmd_search(config, search, &render).await
        }
        Commands::Extract {
            file,
            url,
            format,
            filter,
            output,
        } => {
            let render = RenderOptions {
                format,
                filter,
                output,
            };
            commands::cmd_extract(&config, &file, &url, &render).await
        }
        Commands::Config => commands::cmd_config(&config),
    }
}
