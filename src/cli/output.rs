//! Rendering scraped products as a table, JSON, or CSV.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use console::style;
use serde::Serialize;

use catalog_scout::{ProductRecord, ScrapeOutcome};

const NAME_WIDTH: usize = 60;
const PRICE_WIDTH: usize = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// How results are shown.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub filter: Option<String>,
    pub output: Option<PathBuf>,
}

/// Truncate to at most `max` characters, marking the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Products whose name contains `filter`, ignoring case.
pub fn filter_products(products: &[ProductRecord], filter: Option<&str>) -> Vec<ProductRecord> {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(needle) => {
            let needle = needle.to_lowercase();
            products
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        None => products.to_vec(),
    }
}

pub fn render_table(products: &[ProductRecord], styled: bool) -> String {
    let mut out = String::new();
    if products.is_empty() {
        out.push_str("No products found.\n");
        return out;
    }

    let header = format!(
        "{:>4}  {:<NAME_WIDTH$}  {:<PRICE_WIDTH$}  Sold",
        "#", "Name", "Price"
    );
    let rule = "-".repeat(header.len());
    if styled {
        out.push_str(&format!("{}\n", style(&header).bold()));
    } else {
        out.push_str(&header);
        out.push('\n');
    }
    out.push_str(&rule);
    out.push('\n');

    for (i, product) in products.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<NAME_WIDTH$}  {:<PRICE_WIDTH$}  {}\n",
            i + 1,
            truncate(&product.name, NAME_WIDTH),
            truncate(&product.price, PRICE_WIDTH),
            product.sold
        ));
    }
    out
}

/// One-line summary of a finished scrape.
pub fn summary_line(outcome: &ScrapeOutcome, shown: usize) -> String {
    let mut line = format!(
        "Total: {} products | Pages scraped: {} | With price: {} | With sold count: {}",
        outcome.total(),
        outcome.pages_scraped,
        outcome.with_price(),
        outcome.with_sold_count()
    );
    if shown != outcome.total() {
        line.push_str(&format!(" | Shown: {}", shown));
    }
    line.push_str(&format!(
        " | Stopped: {} | Time: {:.1}s",
        outcome.termination,
        outcome.elapsed().num_milliseconds() as f64 / 1000.0
    ));
    line
}

/// CSV with a `name,price,sold` header row.
pub fn render_csv(products: &[ProductRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["name", "price", "sold"])
        .context("Failed to write CSV header")?;
    for product in products {
        wtr.write_record([&product.name, &product.price, &product.sold])
            .context("Failed to write CSV row")?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    json.push('\n');
    Ok(json)
}

/// Write rendered output to `path`, or stdout when `None`.
pub fn emit(text: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

/// Render a finished scrape according to `options`.
pub fn show_outcome(outcome: &ScrapeOutcome, options: &RenderOptions) -> anyhow::Result<()> {
    let products = filter_products(&outcome.products, options.filter.as_deref());
    let text = match options.format {
        OutputFormat::Json => {
            let filtered = ScrapeOutcome {
                products: products.clone(),
                ..outcome.clone()
            };
            render_json(&filtered)?
        }
        OutputFormat::Csv => render_csv(&products)?,
        OutputFormat::Table => {
            let styled = options.output.is_none();
            let mut text = render_table(&products, styled);
            text.push('\n');
            text.push_str(&summary_line(outcome, products.len()));
            text.push('\n');
            text
        }
    };
    emit(&text, options.output.as_deref())
}

/// Render products read from a saved page.
pub fn show_products(products: &[ProductRecord], options: &RenderOptions) -> anyhow::Result<()> {
    let products = filter_products(products, options.filter.as_deref());
    let text = match options.format {
        OutputFormat::Json => render_json(&products)?,
        OutputFormat::Csv => render_csv(&products)?,
        OutputFormat::Table => {
            let mut text = render_table(&products, options.output.is_none());
            text.push_str(&format!("\nTotal: {} products\n", products.len()));
            text
        }
    };
    emit(&text, options.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_scout::TerminationReason;
    use chrono::{Duration, Utc};

    fn products() -> Vec<ProductRecord> {
        vec![
            ProductRecord::new("Herbal Face Wash 100ml", "Rs. 450", Some("120 sold")).unwrap(),
            ProductRecord::new("Charcoal Soap Bar", "Rs. 199", None).unwrap(),
        ]
    }

    fn outcome() -> ScrapeOutcome {
        let finished_at = Utc::now();
        ScrapeOutcome {
            query: "face wash".into(),
            products: products(),
            pages_scraped: 2,
            termination: TerminationReason::PageBudgetExhausted,
            started_at: finished_at - Duration::milliseconds(12_500),
            finished_at,
        }
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("नमस्ते संसार", 6), "नमस...");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn test_filter_ignores_case() {
        let filtered = filter_products(&products(), Some("FACE"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Herbal Face Wash 100ml");

        assert_eq!(filter_products(&products(), Some("  ")).len(), 2);
        assert_eq!(filter_products(&products(), None).len(), 2);
    }

    #[test]
    fn test_table_lists_products_in_order() {
        let table = render_table(&products(), false);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("Name"));
        assert!(lines[2].contains("Herbal Face Wash 100ml"));
        assert!(lines[2].ends_with("120 sold"));
        assert!(lines[3].contains("Charcoal Soap Bar"));
        assert!(lines[3].ends_with("N/A"));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&[], false), "No products found.\n");
    }

    #[test]
    fn test_summary_line() {
        let line = summary_line(&outcome(), 1);
        assert_eq!(
            line,
            "Total: 2 products | Pages scraped: 2 | With price: 2 | With sold count: 1 \
             | Shown: 1 | Stopped: page budget exhausted | Time: 12.5s"
        );
    }

    #[test]
    fn test_csv_output() {
        let mut products = products();
        products.push(ProductRecord::new("Soap, Pack of 3", "Rs. 1,050", None).unwrap());
        let filtered = filter_products(&products, Some("soap"));

        let csv = render_csv(&filtered).unwrap();
        assert_eq!(
            csv,
            "name,price,sold\n\
             Charcoal Soap Bar,Rs. 199,N/A\n\
             \"Soap, Pack of 3\",\"Rs. 1,050\",N/A\n"
        );
    }

    #[test]
    fn test_csv_of_nothing_is_header_only() {
        assert_eq!(render_csv(&[]).unwrap(), "name,price,sold\n");
    }

    #[test]
    fn test_csv_written_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daraz_soap_results.csv");
        let options = RenderOptions {
            format: OutputFormat::Csv,
            filter: Some("charcoal".into()),
            output: Some(path.clone()),
        };

        show_outcome(&outcome(), &options).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "name,price,sold\nCharcoal Soap Bar,Rs. 199,N/A\n"
        );
    }

    #[test]
    fn test_json_output_is_parseable() {
        let json = render_json(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["termination"], "page_budget_exhausted");
        assert_eq!(value["products"][1]["sold"], "N/A");
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        emit("hello\n", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
