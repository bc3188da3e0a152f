//! Product extraction from a rendered result page.

use regex::Regex;
use tracing::{debug, info};

use super::cascade::{first_found, Attempt};
use super::patterns::{scan, PRICE_RE, SOLD_RE};
use crate::browser::{BrowserSession, Element, PageElement};
use crate::config::SiteProfile;
use crate::models::ProductRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    Text,
    /// Visible text, else the `title` attribute.
    TextOrTitle,
}

/// One tier of a field cascade.
#[derive(Debug)]
enum FieldStrategy<'a> {
    /// First element matched by the first selector that yields a non-blank value.
    Selectors(&'a [String], ReadMode),
    /// First anchor whose text or title is longer than `min_chars`.
    AnchorScan { min_chars: usize },
    /// Regex over the whole item text.
    Pattern(&'static Regex),
}

/// Reads product records off the current page of a session.
pub struct Extractor<'a> {
    profile: &'a SiteProfile,
    name: Vec<FieldStrategy<'a>>,
    price: Vec<FieldStrategy<'a>>,
    sold: Vec<FieldStrategy<'a>>,
}

impl<'a> Extractor<'a> {
    pub fn new(profile: &'a SiteProfile) -> Self {
        Self {
            profile,
            name: vec![
                FieldStrategy::Selectors(&profile.name_selectors, ReadMode::TextOrTitle),
                FieldStrategy::AnchorScan {
                    min_chars: profile.min_name_chars,
                },
            ],
            price: vec![
                FieldStrategy::Selectors(&profile.price_selectors, ReadMode::Text),
                FieldStrategy::Pattern(&PRICE_RE),
            ],
            sold: vec![
                FieldStrategy::Selectors(&profile.sold_selectors, ReadMode::Text),
                FieldStrategy::Pattern(&SOLD_RE),
            ],
        }
    }

    /// Every admissible product on the page, in document order.
    ///
    /// Never fails: a page without recognizable items yields an empty list and
    /// items missing a name or price are skipped.
    pub async fn extract(&self, session: &dyn BrowserSession) -> Vec<ProductRecord> {
        let items = self.containers(session).await;
        if items.is_empty() {
            return Vec::new();
        }

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.extract_item(item.as_ref()).await {
                Some(record) => records.push(record),
                None => debug!("Skipping item {}: no name or price", index),
            }
        }

        info!("Extracted {} of {} items", records.len(), items.len());
        records
    }

    /// Items matched by the first container selector with enough matches.
    async fn containers(&self, session: &dyn BrowserSession) -> Vec<Element> {
        let min = self.profile.min_container_matches;
        let found = first_found(&self.profile.containers[..], |selector| async move {
            match session.find_all(selector).await {
                Ok(items) if items.len() > min => {
                    debug!("Container selector {} matched {} items", selector, items.len());
                    Attempt::Found(items)
                }
                Ok(items) => {
                    debug!(
                        "Container selector {} matched only {} items",
                        selector,
                        items.len()
                    );
                    Attempt::Missing
                }
                Err(e) => Attempt::Failed(e),
            }
        })
        .await;

        match found {
            Attempt::Found(items) => items,
            _ => {
                debug!("No container selector matched more than {} items", min);
                Vec::new()
            }
        }
    }

    async fn extract_item(&self, item: &dyn PageElement) -> Option<ProductRecord> {
        let name = self.field(item, &self.name).await?;
        let price = self.field(item, &self.price).await?;
        let sold = self.field(item, &self.sold).await;
        ProductRecord::new(&name, &price, sold.as_deref())
    }

    async fn field(&self, item: &dyn PageElement, cascade: &[FieldStrategy<'_>]) -> Option<String> {
        first_found(cascade, |strategy| read_field(item, strategy))
            .await
            .found()
    }
}

async fn read_field(item: &dyn PageElement, strategy: &FieldStrategy<'_>) -> Attempt<String> {
    match strategy {
        FieldStrategy::Selectors(selectors, mode) => {
            first_found(*selectors, |selector| read_first(item, selector, *mode)).await
        }
        FieldStrategy::AnchorScan { min_chars } => anchor_scan(item, *min_chars).await,
        FieldStrategy::Pattern(re) => match item.text().await {
            Ok(text) => scan(re, &text).into(),
            Err(e) => Attempt::Failed(e),
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn read_first(item: &dyn PageElement, selector: &str, mode: ReadMode) -> Attempt<String> {
    let matched = match item.find_all(selector).await {
        Ok(matched) => matched,
        Err(e) => return Attempt::Failed(e),
    };
    let Some(el) = matched.first() else {
        return Attempt::Missing;
    };

    match el.text().await {
        Ok(text) => {
            if let Some(text) = non_blank(Some(text)) {
                return Attempt::Found(text);
            }
        }
        Err(e) => return Attempt::Failed(e),
    }

    if mode == ReadMode::TextOrTitle {
        return match el.attribute("title").await {
            Ok(title) => non_blank(title).into(),
            Err(e) => Attempt::Failed(e),
        };
    }
    Attempt::Missing
}

async fn anchor_scan(item: &dyn PageElement, min_chars: usize) -> Attempt<String> {
    let anchors = match item.find_all("a").await {
        Ok(anchors) => anchors,
        Err(e) => return Attempt::Failed(e),
    };
    let long_enough = |v: &String| v.chars().count() > min_chars;

    for anchor in &anchors {
        if let Some(text) = non_blank(anchor.text().await.ok()).filter(long_enough) {
            return Attempt::Found(text);
        }
        if let Some(title) = non_blank(anchor.attribute("title").await.ok().flatten()).filter(long_enough) {
            return Attempt::Found(title);
        }
    }
    Attempt::Missing
}
