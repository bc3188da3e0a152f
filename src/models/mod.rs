//! Data models for catalog-scout.

mod product;
mod progress;

pub use product::{DedupKey, ProductRecord, SOLD_UNKNOWN};
pub use progress::{NullProgress, ProgressEvent, ProgressSink};
