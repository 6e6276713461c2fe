//! Normalized product record parsed from one CSV row

use serde::{Deserialize, Serialize};

/// One parsed CSV row, immutable after creation.
///
/// Rows lacking a title are carried through parsing (so they can be counted
/// as skipped in row order) and rejected by the reconciler before
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title; required for import
    pub title: String,
    /// Product description (may be empty)
    pub description: String,
    /// Non-negative price; unparsable input defaults to 0
    pub price: f64,
    /// External unique-ish identifier, used first for duplicate detection
    pub sku: Option<String>,
    /// Raw tag list: ordered, case-preserved, not deduplicated
    pub tags: Vec<String>,
    /// Syntactically valid image URLs; order defines featured-vs-gallery
    pub image_urls: Vec<String>,
    /// Raw hierarchical category path (separator-agnostic)
    pub taxonomy_path: Option<String>,
    /// Stock quantity, when the column held a parseable integer
    pub quantity: Option<i64>,
    /// External marketplace listing reference
    pub listing_ref: Option<String>,
}

impl ProductRecord {
    /// Whether the row carries the required title
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}
