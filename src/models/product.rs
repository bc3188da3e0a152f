//! Product records extracted from catalog result pages.

use serde::{Deserialize, Serialize};

/// Sentinel stored in `sold` when an item shows no sold/order count.
pub const SOLD_UNKNOWN: &str = "N/A";

/// A single product listing as it appeared on a result page.
///
/// Values are kept as the raw text the site rendered; prices carry their
/// currency tag and are never parsed into numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub price: String,
    pub sold: String,
}

impl ProductRecord {
    /// Build a record, returning `None` unless both name and price carry text.
    pub fn new(name: &str, price: &str, sold: Option<&str>) -> Option<Self> {
        let name = name.trim();
        let price = price.trim();
        if name.is_empty() || price.is_empty() {
            return None;
        }

        let sold = sold
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(SOLD_UNKNOWN);

        Some(Self {
            name: name.to_string(),
            price: price.to_string(),
            sold: sold.to_string(),
        })
    }

    /// Identity used to collapse the same listing seen on several pages.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            name: self.name.trim().to_lowercase(),
            price: self.price.trim().to_string(),
        }
    }

    /// True when the listing had a sold/order count.
    pub fn has_sold_count(&self) -> bool {
        self.sold != SOLD_UNKNOWN
    }
}

/// Lowercased-trimmed name plus trimmed price.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub name: String,
    pub price: String,
}
