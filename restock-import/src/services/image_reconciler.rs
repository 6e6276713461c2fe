//! Image-set diffing and incremental sync
//!
//! URLs are compared by normalized filename only: the path's final segment
//! with any generated thumbnail size suffix (`-640x480`) stripped,
//! lowercased. Host, query string and casing differences do not count as
//! changes, so a CDN move or cache-busting query never retriggers a full
//! re-fetch.

use crate::store::{AttachmentStore, MetadataStore, StoreResult, TaskQueue};
use crate::store::meta_keys;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Task name for the background fetch-and-attach worker
pub const IMAGE_FETCH_TASK: &str = "restock.fetch_image";

/// Spacing between successive image fetch tasks for one product.
/// Concurrent unthrottled fetches are disallowed by design; the delay is a
/// scheduling contract, not an implementation detail.
pub const IMAGE_FETCH_SPACING: Duration = Duration::from_secs(5);

/// Generated-thumbnail size suffix immediately before the extension
static THUMB_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d+x\d+(\.[A-Za-z0-9]+)$").expect("valid thumbnail regex"));

/// Result of diffing current vs. desired image sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageComparison {
    /// Normalized filenames present only in the desired set
    pub added: BTreeSet<String>,
    /// Normalized filenames present only in the current set
    pub removed: BTreeSet<String>,
    /// Normalized filenames present in both
    pub unchanged: BTreeSet<String>,
}

impl ImageComparison {
    pub fn needs_update(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Outcome of one sync call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub updated: bool,
    pub queued: usize,
}

/// Normalize an image URL to its comparison key.
///
/// Takes the path's final filename component, strips a `-<w>x<h>` suffix
/// before the extension, lowercases and trims.
pub fn normalize_image_url(raw: &str) -> String {
    let filename = match Url::parse(raw.trim()) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
            .unwrap_or_default(),
        // Not a parseable URL: fall back to the text after the last slash
        Err(_) => raw
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or("")
            .split('?')
            .next()
            .unwrap_or("")
            .to_string(),
    };

    THUMB_SUFFIX
        .replace(&filename, "$1")
        .trim()
        .to_lowercase()
}

/// Normalizes and diffs image URL sets, and performs incremental sync.
#[derive(Debug, Default)]
pub struct ImageSetReconciler;

impl ImageSetReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Pure set difference over normalized filenames.
    pub fn compare(&self, current_urls: &[String], desired_urls: &[String]) -> ImageComparison {
        let current: BTreeSet<String> = current_urls
            .iter()
            .map(|u| normalize_image_url(u))
            .filter(|n| !n.is_empty())
            .collect();
        let desired: BTreeSet<String> = desired_urls
            .iter()
            .map(|u| normalize_image_url(u))
            .filter(|n| !n.is_empty())
            .collect();

        ImageComparison {
            added: desired.difference(&current).cloned().collect(),
            removed: current.difference(&desired).cloned().collect(),
            unchanged: current.intersection(&desired).cloned().collect(),
        }
    }

    /// Bring an existing product's image set in line with the CSV.
    ///
    /// The current set is the URL list stored at the last sync (falling back
    /// to live attachments for products never synced by this importer). When
    /// a change is detected: persist the desired list + timestamp, clear the
    /// featured image and gallery, and enqueue one background fetch per URL
    /// with index-spaced delays, first URL flagged featured. No change means
    /// no side effects at all.
    pub async fn sync(
        &self,
        product_id: i64,
        desired_urls: &[String],
        meta: &dyn MetadataStore,
        attachments: &dyn AttachmentStore,
        queue: &dyn TaskQueue,
    ) -> StoreResult<SyncOutcome> {
        let current_urls = match meta.get_meta(product_id, meta_keys::IMAGE_URLS).await? {
            Some(stored) => serde_json::from_str::<Vec<String>>(&stored).unwrap_or_default(),
            None => attachments.current_image_urls(product_id).await?,
        };

        let comparison = self.compare(&current_urls, desired_urls);
        if !comparison.needs_update() {
            debug!(product_id, "Image set unchanged, skipping sync");
            return Ok(SyncOutcome {
                updated: false,
                queued: 0,
            });
        }

        debug!(
            product_id,
            added = comparison.added.len(),
            removed = comparison.removed.len(),
            unchanged = comparison.unchanged.len(),
            "Image set changed, re-syncing"
        );

        self.record_sync(product_id, desired_urls, meta).await?;

        attachments.clear_featured_image(product_id).await?;
        attachments.clear_gallery(product_id).await?;

        let queued = self.enqueue_fetches(product_id, desired_urls, queue).await?;
        Ok(SyncOutcome {
            updated: true,
            queued,
        })
    }

    /// Persist the desired URL list and sync timestamp as product metadata.
    pub async fn record_sync(
        &self,
        product_id: i64,
        desired_urls: &[String],
        meta: &dyn MetadataStore,
    ) -> StoreResult<()> {
        let stored = serde_json::to_string(desired_urls)
            .unwrap_or_else(|_| "[]".to_string());
        meta.set_meta(product_id, meta_keys::IMAGE_URLS, &stored).await?;
        meta.set_meta(
            product_id,
            meta_keys::IMAGES_SYNCED_AT,
            &Utc::now().to_rfc3339(),
        )
        .await?;
        Ok(())
    }

    /// Enqueue one fetch-and-attach task per URL, delay `index x spacing`,
    /// first URL flagged as the featured image.
    pub async fn enqueue_fetches(
        &self,
        product_id: i64,
        urls: &[String],
        queue: &dyn TaskQueue,
    ) -> StoreResult<usize> {
        for (index, url) in urls.iter().enumerate() {
            queue
                .enqueue(
                    IMAGE_FETCH_TASK,
                    serde_json::json!({
                        "product_id": product_id,
                        "url": url,
                        "is_featured": index == 0,
                        "position": index,
                    }),
                    IMAGE_FETCH_SPACING * index as u32,
                )
                .await?;
        }
        Ok(urls.len())
    }
}
