//! Hierarchical taxonomy path resolution
//!
//! Resolves a raw category path ("Home & Living > Furniture > Chairs") into
//! stored category identifiers, creating missing nodes along the way. The
//! whole ancestor chain is created so the hierarchy exists for browsing, but
//! only the deepest node is returned for assignment: a product belongs to a
//! single taxonomy level, not every ancestor at once.

use crate::store::{CatalogStore, StoreError, StoreResult};
use tracing::debug;

/// Resolver over the catalog's category taxonomy
pub struct TaxonomyPathResolver<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> TaxonomyPathResolver<'a> {
    pub fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Resolve a path root-to-leaf into the deepest node's identifier.
    ///
    /// `" / "`, standalone `">"` and `" > "` are equivalent separators.
    /// Segments that cannot be found are created when `create_missing` is
    /// set; a creation race resolves to the pre-existing node. With creation
    /// disabled an unknown segment is skipped and resolution continues with
    /// the remaining segments. Empty input or nothing resolved yields an
    /// empty list.
    pub async fn resolve(&self, path: &str, create_missing: bool) -> StoreResult<Vec<i64>> {
        let segments = split_segments(path);
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let mut parent = 0i64;
        let mut resolved: Vec<i64> = Vec::new();

        for segment in &segments {
            match self.catalog.find_category(segment, parent).await? {
                Some(node) => {
                    parent = node.id;
                    resolved.push(node.id);
                }
                None if create_missing => {
                    let node = match self
                        .catalog
                        .create_category(segment, parent, &slugify(segment))
                        .await
                    {
                        Ok(node) => node,
                        // Lost the creation race; the existing node wins
                        Err(StoreError::DuplicateCategory { existing }) => existing,
                        Err(err) => return Err(err),
                    };
                    debug!(category = %segment, id = node.id, parent, "Category resolved");
                    parent = node.id;
                    resolved.push(node.id);
                }
                None => {
                    // Creation disabled: skip this segment, keep walking
                    debug!(category = %segment, parent, "Unknown category segment skipped");
                }
            }
        }

        // Deepest node only; assigning the full chain would put the product
        // on multiple taxonomy levels simultaneously
        Ok(resolved.last().map(|id| vec![*id]).unwrap_or_default())
    }
}

/// Split a raw path on the equivalent hierarchy separators, trimming each
/// segment and dropping empties. No separator present means a single-segment
/// path.
fn split_segments(path: &str) -> Vec<String> {
    path.replace(" / ", " > ")
        .split('>')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// URL-safe slug for a category name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
