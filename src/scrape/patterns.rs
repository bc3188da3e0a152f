//! Free-text patterns used when no structural selector matched.

use std::sync::LazyLock;

use regex::Regex;

/// Currency-prefixed amount: `Rs 1,299`, `Rs.450.50`, `NPR 2000`.
pub static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:rs\.?|npr)\s*\d[\d,]*(?:\.\d+)?").expect("valid price regex")
});

/// Sold/order count: `120 sold`, `1.2k sold`, `5K+ orders`, `1 order`.
pub static SOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:[.,]\d+)?[km]?\+?\s*(?:sold|orders?)\b").expect("valid sold regex")
});

/// First match of `re` in `text`, as written.
pub fn scan(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().trim().to_string())
}
