//! Per-row reconciliation pipeline
//!
//! Takes one parsed row through Parsed → Classified → TaxonomyResolved →
//! {Created | Updated | Skipped}: keyword fallback when the AI left the row
//! unresolved, category-id resolution, duplicate detection (SKU first, then
//! exact title), then either an in-place update or a fresh catalog entry
//! with tag/metadata/image handling.

use crate::models::{
    ClassificationResult, ClassificationSource, ImportOptions, ProductRecord,
};
use crate::services::image_reconciler::ImageSetReconciler;
use crate::services::keyword_matcher::KeywordCategoryMatcher;
use crate::services::taxonomy_resolver::TaxonomyPathResolver;
use crate::services::zero_shot_classifier::PriorAssignments;
use crate::store::{
    meta_keys, AttachmentStore, CatalogStore, CategoryNode, MetadataStore, NewProduct,
    StoreResult, TaskQueue,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Terminal state of one processed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created { product_id: i64, images_queued: usize },
    Updated { product_id: i64, images_queued: usize },
    Skipped { reason: String },
}

/// Outcome plus the classification that drove it (for trace logging)
#[derive(Debug, Clone)]
pub struct RowResult {
    pub outcome: RowOutcome,
    pub classification: ClassificationResult,
}

/// Duplicate detection: SKU exact match first, then exact title.
/// First match wins; SKU takes precedence.
pub async fn find_existing(
    catalog: &dyn CatalogStore,
    record: &ProductRecord,
) -> StoreResult<Option<i64>> {
    if let Some(sku) = record.sku.as_deref() {
        if !sku.trim().is_empty() {
            if let Some(id) = catalog.find_by_sku(sku).await? {
                return Ok(Some(id));
            }
        }
    }
    catalog.find_by_exact_title(&record.title).await
}

/// Prior AI assignments read from the catalog + metadata stores, used by the
/// classifier's skip-reclassify mode.
pub struct StoredAssignments {
    catalog: Arc<dyn CatalogStore>,
    meta: Arc<dyn MetadataStore>,
}

impl StoredAssignments {
    pub fn new(catalog: Arc<dyn CatalogStore>, meta: Arc<dyn MetadataStore>) -> Self {
        Self { catalog, meta }
    }
}

#[async_trait]
impl PriorAssignments for StoredAssignments {
    async fn prior_ai_category(&self, record: &ProductRecord) -> Option<String> {
        let id = find_existing(self.catalog.as_ref(), record)
            .await
            .ok()
            .flatten()?;
        let flag = self
            .meta
            .get_meta(id, meta_keys::AI_CATEGORIZED)
            .await
            .ok()
            .flatten()?;
        if flag != "yes" {
            return None;
        }
        let categories = self.catalog.categories_for_product(id).await.ok()?;
        categories.first().map(|c| c.name.clone())
    }
}

/// Orchestrates reconciliation of parsed rows against the catalog
pub struct CatalogReconciler {
    catalog: Arc<dyn CatalogStore>,
    meta: Arc<dyn MetadataStore>,
    attachments: Arc<dyn AttachmentStore>,
    queue: Arc<dyn TaskQueue>,
    images: ImageSetReconciler,
    matcher: KeywordCategoryMatcher,
    options: ImportOptions,
}

impl CatalogReconciler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        meta: Arc<dyn MetadataStore>,
        attachments: Arc<dyn AttachmentStore>,
        queue: Arc<dyn TaskQueue>,
        options: ImportOptions,
    ) -> Self {
        Self {
            catalog,
            meta,
            attachments,
            queue,
            images: ImageSetReconciler::new(),
            matcher: KeywordCategoryMatcher::new(),
            options,
        }
    }

    /// Process one row. `pre_classified` carries the AI result when the
    /// pre-classification pass produced one; unresolved rows fall back to
    /// keyword matching here.
    ///
    /// Any error is row-scoped: the controller catches it at the row
    /// boundary and the run continues.
    pub async fn process(
        &self,
        record: &ProductRecord,
        pre_classified: Option<ClassificationResult>,
    ) -> StoreResult<RowResult> {
        if !record.has_title() {
            return Ok(RowResult {
                outcome: RowOutcome::Skipped {
                    reason: "missing title".to_string(),
                },
                classification: ClassificationResult::unresolved(),
            });
        }

        let terms = self.catalog.category_terms().await?;
        let classification = self.classify(record, pre_classified, &terms);
        let category_ids = self.resolve_categories(record, &classification, &terms).await?;

        match find_existing(self.catalog.as_ref(), record).await? {
            Some(product_id) => {
                self.update_existing(product_id, record, &classification, &category_ids)
                    .await
                    .map(|outcome| RowResult {
                        outcome,
                        classification,
                    })
            }
            None => self
                .create_new(record, &classification, &category_ids)
                .await
                .map(|outcome| RowResult {
                    outcome,
                    classification,
                }),
        }
    }

    /// AI result when resolved, keyword fallback otherwise. An attempted but
    /// unresolved AI classification keeps its trace ahead of the keyword
    /// trace so the log reads in decision order.
    fn classify(
        &self,
        record: &ProductRecord,
        pre_classified: Option<ClassificationResult>,
        terms: &[CategoryNode],
    ) -> ClassificationResult {
        match pre_classified {
            Some(ai) if ai.is_resolved() => ai,
            attempted => {
                let mut keyword = self.matcher.classify(&record.tags, &record.title, terms);
                if let Some(ai) = attempted {
                    let mut trace = ai.trace;
                    trace.append(&mut keyword.trace);
                    keyword.trace = trace;
                }
                keyword
            }
        }
    }

    /// Category identifiers for assignment: the classified category name
    /// first (matched against known terms before falling back to path
    /// resolution, so nested names do not spawn root-level duplicates), then
    /// the row's taxonomy path, then the configured default.
    async fn resolve_categories(
        &self,
        record: &ProductRecord,
        classification: &ClassificationResult,
        terms: &[CategoryNode],
    ) -> StoreResult<Vec<i64>> {
        let resolver = TaxonomyPathResolver::new(self.catalog.as_ref());

        if let Some(name) = &classification.category {
            if let Some(node) = terms.iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
                return Ok(vec![node.id]);
            }
            let ids = resolver.resolve(name, true).await?;
            if !ids.is_empty() {
                return Ok(ids);
            }
        }

        if let Some(path) = &record.taxonomy_path {
            let ids = resolver.resolve(path, true).await?;
            if !ids.is_empty() {
                return Ok(ids);
            }
        }

        Ok(self.options.default_category.map(|id| vec![id]).unwrap_or_default())
    }

    async fn update_existing(
        &self,
        product_id: i64,
        record: &ProductRecord,
        classification: &ClassificationResult,
        category_ids: &[i64],
    ) -> StoreResult<RowOutcome> {
        debug!(product_id, title = %record.title, "Updating existing product");

        if !category_ids.is_empty() {
            self.catalog.set_categories(product_id, category_ids).await?;
        }

        self.write_classification_meta(product_id, classification).await?;

        if let Some(listing_ref) = &record.listing_ref {
            self.meta
                .set_meta(product_id, meta_keys::LISTING_REF, listing_ref)
                .await?;
        }

        let images_queued = if self.options.sync_images {
            self.images
                .sync(
                    product_id,
                    &record.image_urls,
                    self.meta.as_ref(),
                    self.attachments.as_ref(),
                    self.queue.as_ref(),
                )
                .await?
                .queued
        } else {
            0
        };

        Ok(RowOutcome::Updated {
            product_id,
            images_queued,
        })
    }

    async fn create_new(
        &self,
        record: &ProductRecord,
        classification: &ClassificationResult,
        category_ids: &[i64],
    ) -> StoreResult<RowOutcome> {
        let digital = self.options.import_as_digital;
        // Digital items never track stock and are always in stock; physical
        // items track stock only when the CSV supplied a numeric quantity
        let manage_stock = !digital && record.quantity.is_some();

        let fields = NewProduct {
            title: record.title.clone(),
            description: record.description.clone(),
            price: record.price,
            sku: record.sku.clone(),
            status: if self.options.as_draft {
                "draft".to_string()
            } else {
                "publish".to_string()
            },
            is_virtual: digital,
            manage_stock,
            stock_quantity: if manage_stock { record.quantity } else { None },
            in_stock: digital || record.quantity.map(|q| q > 0).unwrap_or(true),
        };

        let product_id = self.catalog.create_product(&fields).await?;
        debug!(product_id, title = %record.title, "Created product");

        if !category_ids.is_empty() {
            self.catalog.set_categories(product_id, category_ids).await?;
        }
        if !record.tags.is_empty() {
            self.catalog.set_tags(product_id, &record.tags).await?;
        }

        self.write_classification_meta(product_id, classification).await?;

        if let Some(listing_ref) = &record.listing_ref {
            self.meta
                .set_meta(product_id, meta_keys::LISTING_REF, listing_ref)
                .await?;
        }

        // Brand-new entry: every image is fetched, no diffing needed. The
        // URL list is still recorded so the next import can diff against it.
        let images_queued = if record.image_urls.is_empty() {
            0
        } else {
            self.images
                .record_sync(product_id, &record.image_urls, self.meta.as_ref())
                .await?;
            self.images
                .enqueue_fetches(product_id, &record.image_urls, self.queue.as_ref())
                .await?
        };

        Ok(RowOutcome::Created {
            product_id,
            images_queued,
        })
    }

    /// Mark the product AI-categorized when the assignment came fresh from
    /// the classifier (reused assignments keep their original stamp).
    async fn write_classification_meta(
        &self,
        product_id: i64,
        classification: &ClassificationResult,
    ) -> StoreResult<()> {
        if classification.source == ClassificationSource::Ai
            && classification.is_resolved()
            && !classification.reused
        {
            self.meta
                .set_meta(product_id, meta_keys::AI_CATEGORIZED, "yes")
                .await?;
            self.meta
                .set_meta(
                    product_id,
                    meta_keys::AI_CATEGORIZED_AT,
                    &Utc::now().to_rfc3339(),
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        test_pool, AttachmentRepository, CatalogRepository, MetaRepository, TaskRepository,
    };
    use sqlx::SqlitePool;

    struct Fixture {
        pool: SqlitePool,
        catalog: Arc<CatalogRepository>,
        meta: Arc<MetaRepository>,
        tasks: Arc<TaskRepository>,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        Fixture {
            catalog: Arc::new(CatalogRepository::new(pool.clone())),
            meta: Arc::new(MetaRepository::new(pool.clone())),
            tasks: Arc::new(TaskRepository::new(pool.clone())),
            pool,
        }
    }

    fn reconciler(fx: &Fixture, options: ImportOptions) -> CatalogReconciler {
        CatalogReconciler::new(
            fx.catalog.clone(),
            fx.meta.clone(),
            Arc::new(AttachmentRepository::new(fx.pool.clone())),
            fx.tasks.clone(),
            options,
        )
    }

    fn record(title: &str) -> ProductRecord {
        ProductRecord {
            title: title.to_string(),
            description: "desc".to_string(),
            price: 5.99,
            sku: None,
            tags: vec![],
            image_urls: vec![],
            taxonomy_path: None,
            quantity: None,
            listing_ref: None,
        }
    }

    #[tokio::test]
    async fn missing_title_skips_before_classification() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let result = rec.process(&record(""), None).await.unwrap();
        assert!(matches!(result.outcome, RowOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn new_row_creates_product_with_stock_rules() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let mut row = record("Baby Shower Bingo");
        row.quantity = Some(3);
        row.sku = Some("BSB-01".into());

        let result = rec.process(&row, None).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created, got {:?}", result.outcome);
        };

        let (manage_stock, stock_quantity, in_stock, is_virtual, status): (bool, Option<i64>, bool, bool, String) =
            sqlx::query_as(
                "SELECT manage_stock, stock_quantity, in_stock, is_virtual, status FROM products WHERE id = ?",
            )
            .bind(product_id)
            .fetch_one(&fx.pool)
            .await
            .unwrap();
        assert!(manage_stock);
        assert_eq!(stock_quantity, Some(3));
        assert!(in_stock);
        assert!(!is_virtual);
        assert_eq!(status, "publish");
    }

    #[tokio::test]
    async fn digital_items_never_track_stock() {
        let fx = fixture().await;
        let rec = reconciler(
            &fx,
            ImportOptions {
                import_as_digital: true,
                as_draft: true,
                ..Default::default()
            },
        );

        let mut row = record("Printable Card");
        row.quantity = Some(0);

        let result = rec.process(&row, None).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created");
        };

        let (manage_stock, stock_quantity, in_stock, is_virtual, status): (bool, Option<i64>, bool, bool, String) =
            sqlx::query_as(
                "SELECT manage_stock, stock_quantity, in_stock, is_virtual, status FROM products WHERE id = ?",
            )
            .bind(product_id)
            .fetch_one(&fx.pool)
            .await
            .unwrap();
        assert!(!manage_stock);
        assert_eq!(stock_quantity, None);
        assert!(in_stock, "digital items are always in stock");
        assert!(is_virtual);
        assert_eq!(status, "draft");
    }

    #[tokio::test]
    async fn sku_match_wins_over_title() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let mut by_sku = record("Old Title");
        by_sku.sku = Some("SKU-9".into());
        let created = rec.process(&by_sku, None).await.unwrap();
        let RowOutcome::Created { product_id: sku_id, .. } = created.outcome else {
            panic!("expected Created");
        };

        // Another product whose title matches the second row's title
        let decoy = rec.process(&record("New Title"), None).await.unwrap();
        let RowOutcome::Created { product_id: decoy_id, .. } = decoy.outcome else {
            panic!("expected Created");
        };

        let mut update = record("New Title");
        update.sku = Some("SKU-9".into());
        let result = rec.process(&update, None).await.unwrap();
        let RowOutcome::Updated { product_id, .. } = result.outcome else {
            panic!("expected Updated, got {:?}", result.outcome);
        };
        assert_eq!(product_id, sku_id);
        assert_ne!(product_id, decoy_id);
    }

    #[tokio::test]
    async fn second_import_updates_instead_of_duplicating() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let row = record("Garden Gnome");
        let first = rec.process(&row, None).await.unwrap();
        assert!(matches!(first.outcome, RowOutcome::Created { .. }));

        let second = rec.process(&row, None).await.unwrap();
        assert!(matches!(second.outcome, RowOutcome::Updated { .. }));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&fx.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn default_category_applies_when_nothing_resolves() {
        let fx = fixture().await;
        let bucket = fx
            .catalog
            .create_category("Uncategorized", 0, "uncategorized")
            .await
            .unwrap();
        let rec = reconciler(
            &fx,
            ImportOptions {
                default_category: Some(bucket.id),
                ..Default::default()
            },
        );

        let result = rec.process(&record("Opaque Widget"), None).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created");
        };

        let assigned = fx.catalog.categories_for_product(product_id).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, bucket.id);
    }

    #[tokio::test]
    async fn taxonomy_path_creates_and_assigns_deepest() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let mut row = record("Oak Chair");
        row.taxonomy_path = Some("Home & Living > Furniture > Chairs".into());

        let result = rec.process(&row, None).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created");
        };

        let assigned = fx.catalog.categories_for_product(product_id).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].name, "Chairs");
        assert_eq!(fx.catalog.count_categories().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn fresh_ai_classification_stamps_metadata() {
        let fx = fixture().await;
        fx.catalog.create_category("Toys", 0, "toys").await.unwrap();
        let rec = reconciler(&fx, ImportOptions::default());

        let ai = ClassificationResult::resolved("Toys", 0.85, ClassificationSource::Ai);
        let result = rec.process(&record("Wooden Blocks"), Some(ai)).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created");
        };

        assert_eq!(
            fx.meta.get_meta(product_id, meta_keys::AI_CATEGORIZED).await.unwrap(),
            Some("yes".to_string())
        );
        assert!(fx
            .meta
            .get_meta(product_id, meta_keys::AI_CATEGORIZED_AT)
            .await
            .unwrap()
            .is_some());

        let assigned = fx.catalog.categories_for_product(product_id).await.unwrap();
        assert_eq!(assigned[0].name, "Toys");
    }

    #[tokio::test]
    async fn reused_ai_classification_does_not_restamp() {
        let fx = fixture().await;
        fx.catalog.create_category("Toys", 0, "toys").await.unwrap();
        let rec = reconciler(&fx, ImportOptions::default());

        let mut reused = ClassificationResult::resolved("Toys", 1.0, ClassificationSource::Ai);
        reused.reused = true;
        let result = rec.process(&record("Wooden Blocks"), Some(reused)).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created");
        };

        assert_eq!(
            fx.meta.get_meta(product_id, meta_keys::AI_CATEGORIZED).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn unresolved_ai_falls_back_to_keywords() {
        let fx = fixture().await;
        fx.catalog.create_category("Weddings", 0, "weddings").await.unwrap();
        let rec = reconciler(&fx, ImportOptions::default());

        let mut row = record("Vintage Wedding Invitation");
        row.tags = vec!["wedding".into(), "invitation".into()];

        let ai = ClassificationResult::unresolved();
        let result = rec.process(&row, Some(ai)).await.unwrap();

        assert_eq!(result.classification.source, ClassificationSource::Keyword);
        assert_eq!(result.classification.category.as_deref(), Some("Weddings"));
    }

    #[tokio::test]
    async fn new_product_enqueues_all_images_with_spacing() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let mut row = record("Photo Frame");
        row.image_urls = vec!["https://x/a.jpg".into(), "https://x/b.jpg".into()];

        let result = rec.process(&row, None).await.unwrap();
        let RowOutcome::Created { images_queued, .. } = result.outcome else {
            panic!("expected Created");
        };
        assert_eq!(images_queued, 2);

        let tasks = fx.tasks.pending().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].payload["is_featured"], true);
        assert_eq!(tasks[1].payload["is_featured"], false);
    }

    #[tokio::test]
    async fn listing_ref_is_stored() {
        let fx = fixture().await;
        let rec = reconciler(&fx, ImportOptions::default());

        let mut row = record("Linked Item");
        row.listing_ref = Some("987654".into());

        let result = rec.process(&row, None).await.unwrap();
        let RowOutcome::Created { product_id, .. } = result.outcome else {
            panic!("expected Created");
        };

        assert_eq!(
            fx.meta.get_meta(product_id, meta_keys::LISTING_REF).await.unwrap(),
            Some("987654".to_string())
        );
    }
}
