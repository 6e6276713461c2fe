//! Narrow collaborator interfaces consumed by the import core
//!
//! The reconciliation engine talks to the catalog, the per-product metadata
//! store, the attachment service, and the background task queue exclusively
//! through these traits. The SQLite implementations live in `db/`; tests may
//! substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Store-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Category creation raced with an existing (name, parent) pair.
    /// Carries the pre-existing node so callers can resolve to it.
    #[error("category '{}' already exists under parent {}", .existing.name, .existing.parent)]
    DuplicateCategory { existing: CategoryNode },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One taxonomy node. Parent 0 means root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    pub parent: i64,
    pub slug: String,
}

/// Fields for a new catalog entry
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub sku: Option<String>,
    /// "publish" or "draft"
    pub status: String,
    /// Virtual/downloadable product
    pub is_virtual: bool,
    /// Whether stock levels are tracked
    pub manage_stock: bool,
    /// Stock quantity when tracked
    pub stock_quantity: Option<i64>,
    /// In-stock flag (digital items are always in stock)
    pub in_stock: bool,
}

/// Partial update for an existing catalog entry; None leaves a field as-is.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<String>,
    pub stock_quantity: Option<i64>,
}

/// Product catalog and category taxonomy access
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Exact-match lookup by SKU
    async fn find_by_sku(&self, sku: &str) -> StoreResult<Option<i64>>;

    /// Exact-match lookup by title
    async fn find_by_exact_title(&self, title: &str) -> StoreResult<Option<i64>>;

    async fn create_product(&self, fields: &NewProduct) -> StoreResult<i64>;

    async fn update_product(&self, id: i64, fields: &ProductUpdate) -> StoreResult<()>;

    /// Replace the product's category assignments
    async fn set_categories(&self, id: i64, categories: &[i64]) -> StoreResult<()>;

    /// Replace the product's tag associations
    async fn set_tags(&self, id: i64, tags: &[String]) -> StoreResult<()>;

    /// Categories currently assigned to a product
    async fn categories_for_product(&self, id: i64) -> StoreResult<Vec<CategoryNode>>;

    /// All category terms
    async fn category_terms(&self) -> StoreResult<Vec<CategoryNode>>;

    /// Lookup by (name, parent); name matching is case-insensitive
    async fn find_category(&self, name: &str, parent: i64) -> StoreResult<Option<CategoryNode>>;

    /// Create a category under the given parent.
    ///
    /// Must detect a concurrent duplicate and return
    /// [`StoreError::DuplicateCategory`] carrying the existing node instead
    /// of failing opaquely.
    async fn create_category(&self, name: &str, parent: i64, slug: &str)
        -> StoreResult<CategoryNode>;

    async fn count_categories(&self) -> StoreResult<i64>;
}

/// String-keyed per-product metadata
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_meta(&self, product_id: i64, key: &str) -> StoreResult<Option<String>>;
    async fn set_meta(&self, product_id: i64, key: &str, value: &str) -> StoreResult<()>;
    async fn delete_meta(&self, product_id: i64, key: &str) -> StoreResult<()>;
}

/// Attached image bookkeeping.
///
/// The import core only reads current URLs and clears associations; the
/// set/append operations exist for the out-of-scope background fetch worker.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn current_image_urls(&self, product_id: i64) -> StoreResult<Vec<String>>;
    async fn set_featured_image(&self, product_id: i64, url: &str) -> StoreResult<()>;
    async fn append_gallery_image(&self, product_id: i64, url: &str) -> StoreResult<()>;
    async fn clear_featured_image(&self, product_id: i64) -> StoreResult<()>;
    async fn clear_gallery(&self, product_id: i64) -> StoreResult<()>;
}

/// Background task queue; the core's responsibility ends at enqueueing.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(
        &self,
        name: &str,
        payload: serde_json::Value,
        run_after: Duration,
    ) -> StoreResult<()>;
}

/// Metadata keys written by the import core
pub mod meta_keys {
    /// "yes" when the product's category came from the AI classifier
    pub const AI_CATEGORIZED: &str = "_restock_ai_categorized";
    /// RFC 3339 timestamp of the AI assignment
    pub const AI_CATEGORIZED_AT: &str = "_restock_ai_categorized_at";
    /// JSON array of the image URLs last synced for the product
    pub const IMAGE_URLS: &str = "_restock_image_urls";
    /// RFC 3339 timestamp of the last image sync
    pub const IMAGES_SYNCED_AT: &str = "_restock_images_synced_at";
    /// External marketplace listing reference
    pub const LISTING_REF: &str = "_restock_listing_ref";
}
