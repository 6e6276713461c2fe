//! Per-run import options

use serde::{Deserialize, Serialize};

/// Options accepted alongside the CSV when starting an import.
///
/// Defaults are the conservative path: keyword classification only, image
/// sync on, products published immediately as physical goods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Use the remote zero-shot classifier before keyword matching
    pub use_ai: bool,
    /// Reuse prior AI assignments instead of re-classifying matched products
    pub skip_ai_reclassify: bool,
    /// Diff and re-sync image sets on updated products
    pub sync_images: bool,
    /// Category assigned when resolution yields nothing
    pub default_category: Option<i64>,
    /// Create products as drafts instead of publishing
    pub as_draft: bool,
    /// Import rows as virtual/downloadable products (never stock-tracked)
    pub import_as_digital: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            use_ai: false,
            skip_ai_reclassify: true,
            sync_images: true,
            default_category: None,
            as_draft: false,
            import_as_digital: false,
        }
    }
}
