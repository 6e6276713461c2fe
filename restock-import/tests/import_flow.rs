//! End-to-end import scenarios against an in-memory catalog

use async_trait::async_trait;
use restock_common::events::{EventBus, ImportEvent};
use restock_import::db::{
    init_tables, AttachmentRepository, CatalogRepository, MetaRepository, TaskRepository,
};
use restock_import::models::{ImportOptions, ImportSession, ImportState};
use restock_import::services::zero_shot_classifier::{
    ClassifierConfig, ClassifierTransport, ClassifyError, ClientTuning, HttpReply,
    ZeroShotClassifierClient,
};
use restock_import::services::ImportStreamController;
use restock_import::store::{meta_keys, CatalogStore, MetadataStore};
use sqlx::SqlitePool;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

struct Harness {
    pool: SqlitePool,
    catalog: Arc<CatalogRepository>,
    meta: Arc<MetaRepository>,
    tasks: Arc<TaskRepository>,
    events: EventBus,
}

async fn harness() -> Harness {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    init_tables(&pool).await.unwrap();
    Harness {
        catalog: Arc::new(CatalogRepository::new(pool.clone())),
        meta: Arc::new(MetaRepository::new(pool.clone())),
        tasks: Arc::new(TaskRepository::new(pool.clone())),
        events: EventBus::new(1024),
        pool,
    }
}

impl Harness {
    fn controller(&self, config: ClassifierConfig) -> ImportStreamController {
        ImportStreamController::new(
            self.catalog.clone(),
            self.meta.clone(),
            Arc::new(AttachmentRepository::new(self.pool.clone())),
            self.tasks.clone(),
            config,
            self.events.clone(),
            CancellationToken::new(),
        )
    }

    async fn run(&self, csv: &NamedTempFile, options: ImportOptions) -> ImportSession {
        let mut session = ImportSession::new(csv.path().display().to_string(), options);
        self.controller(ClassifierConfig::default())
            .run(&mut session)
            .await
            .unwrap();
        session
    }

    async fn product_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const BABY_SHOWER_CSV: &str = "TITLE,PRICE,TAGS,IMAGE1\n\
    \"Baby Shower Bingo\",5.99,\"baby,shower,game\",https://x/img.jpg\n";

#[tokio::test]
async fn single_row_import_against_empty_catalog() {
    let fx = harness().await;
    let bucket = fx
        .catalog
        .create_category("Uncategorized", 0, "uncategorized")
        .await
        .unwrap();

    let csv = write_csv(BABY_SHOWER_CSV);
    let session = fx
        .run(
            &csv,
            ImportOptions {
                default_category: Some(bucket.id),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(session.state, ImportState::Completed);
    assert_eq!(session.summary.imported, 1);
    assert_eq!(session.summary.updated, 0);
    assert_eq!(session.summary.skipped, 0);
    assert_eq!(session.summary.images_queued, 1);

    // Product landed with parsed fields
    let id = fx
        .catalog
        .find_by_exact_title("Baby Shower Bingo")
        .await
        .unwrap()
        .expect("product created");
    let (price,): (f64,) = sqlx::query_as("SELECT price FROM products WHERE id = ?")
        .bind(id)
        .fetch_one(&fx.pool)
        .await
        .unwrap();
    assert!((price - 5.99).abs() < 1e-9);

    // No keyword match possible against only the default bucket, so the
    // configured default applies
    let assigned = fx.catalog.categories_for_product(id).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, bucket.id);

    // One image fetch queued, zero delay, flagged featured
    let tasks = fx.tasks.pending().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "restock.fetch_image");
    assert_eq!(tasks[0].payload["is_featured"], true);
    assert_eq!(tasks[0].payload["url"], "https://x/img.jpg");
}

#[tokio::test]
async fn reimport_updates_existing_without_duplicating() {
    let fx = harness().await;

    let csv = write_csv(BABY_SHOWER_CSV);
    let first = fx.run(&csv, ImportOptions::default()).await;
    assert_eq!(first.summary.imported, 1);
    assert_eq!(fx.product_count().await, 1);

    let second = fx.run(&csv, ImportOptions::default()).await;
    assert_eq!(second.summary.imported, 0);
    assert_eq!(second.summary.updated, 1);
    assert_eq!(fx.product_count().await, 1);
}

#[tokio::test]
async fn reimport_is_idempotent_for_categories_and_images() {
    let fx = harness().await;

    let csv = write_csv(
        "TITLE,PRICE,SKU,SECTION,IMAGE1\n\
         Oak Chair,120.00,OAK-1,Home & Living > Furniture > Chairs,https://x/chair.jpg\n",
    );

    let first = fx.run(&csv, ImportOptions::default()).await;
    assert_eq!(first.summary.imported, 1);
    assert_eq!(first.summary.categories_created, 3);
    let categories_after_first = fx.catalog.count_categories().await.unwrap();

    let second = fx.run(&csv, ImportOptions::default()).await;
    assert_eq!(second.summary.updated, 1);
    assert_eq!(second.summary.categories_created, 0);
    assert_eq!(
        fx.catalog.count_categories().await.unwrap(),
        categories_after_first
    );

    // Identical image set: the second run queues nothing new
    assert_eq!(second.summary.images_queued, 0);
    assert_eq!(fx.tasks.pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn keyword_classification_applies_when_score_reaches_threshold() {
    let fx = harness().await;
    fx.catalog
        .create_category("Weddings", 0, "weddings")
        .await
        .unwrap();

    let csv = write_csv(
        "TITLE,PRICE,TAGS\n\
         Vintage Wedding Invitation,3.50,\"wedding,invitation\"\n",
    );
    let session = fx.run(&csv, ImportOptions::default()).await;
    assert_eq!(session.summary.imported, 1);

    let id = fx
        .catalog
        .find_by_exact_title("Vintage Wedding Invitation")
        .await
        .unwrap()
        .unwrap();
    let assigned = fx.catalog.categories_for_product(id).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].name, "Weddings");
}

#[tokio::test]
async fn sku_takes_precedence_over_title_on_reimport() {
    let fx = harness().await;

    let csv = write_csv("TITLE,SKU,PRICE\nOriginal Name,ABC-1,10.00\n");
    fx.run(&csv, ImportOptions::default()).await;

    // Same SKU, renamed title: must update the same product
    let renamed = write_csv("TITLE,SKU,PRICE\nRenamed Product,ABC-1,10.00\n");
    let session = fx.run(&renamed, ImportOptions::default()).await;

    assert_eq!(session.summary.updated, 1);
    assert_eq!(fx.product_count().await, 1);
}

/// Classifier transport fake: scripted replies, shared across calls.
struct ScriptedTransport {
    replies: std::sync::Mutex<Vec<Result<HttpReply, ClassifyError>>>,
}

#[async_trait]
impl ClassifierTransport for ScriptedTransport {
    async fn post(&self, _body: &serde_json::Value) -> Result<HttpReply, ClassifyError> {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok(HttpReply {
                status: 200,
                body: "[]".to_string(),
            })
        } else {
            replies.remove(0)
        }
    }
}

fn ok_reply(body: &str) -> Result<HttpReply, ClassifyError> {
    Ok(HttpReply {
        status: 200,
        body: body.to_string(),
    })
}

#[tokio::test]
async fn low_confidence_ai_falls_back_to_keyword_matching() {
    let fx = harness().await;
    fx.catalog
        .create_category("Weddings", 0, "weddings")
        .await
        .unwrap();
    fx.catalog.create_category("Toys", 0, "toys").await.unwrap();

    let config = ClassifierConfig {
        enabled: true,
        api_token: Some("hf_test".into()),
        skip_reclassify: false,
        ..Default::default()
    };

    // Warmup reply, then a below-threshold answer for the single row
    let transport = Arc::new(ScriptedTransport {
        replies: std::sync::Mutex::new(vec![
            ok_reply(r#"[{"label":"Toys","score":0.9}]"#),
            ok_reply(r#"[{"label":"Toys","score":0.15}]"#),
        ]),
    });
    let classifier = ZeroShotClassifierClient::with_transport(config.clone(), transport)
        .with_tuning(ClientTuning::default())
        .with_events(fx.events.clone());

    let csv = write_csv(
        "TITLE,PRICE,TAGS\n\
         Vintage Wedding Invitation,3.50,\"wedding,invitation\"\n",
    );
    let mut session = ImportSession::new(
        csv.path().display().to_string(),
        ImportOptions {
            use_ai: true,
            ..Default::default()
        },
    );

    let mut rx = fx.events.subscribe();
    fx.controller(config)
        .with_classifier(classifier)
        .run(&mut session)
        .await
        .unwrap();

    // AI was attempted but rejected at the 0.20 threshold; keyword matching
    // took over and resolved "Weddings"
    let id = fx
        .catalog
        .find_by_exact_title("Vintage Wedding Invitation")
        .await
        .unwrap()
        .unwrap();
    let assigned = fx.catalog.categories_for_product(id).await.unwrap();
    assert_eq!(assigned[0].name, "Weddings");

    // Not flagged as AI-categorized
    assert_eq!(
        fx.meta.get_meta(id, meta_keys::AI_CATEGORIZED).await.unwrap(),
        None
    );

    // Batch events preceded row events; batch metadata is surfaced
    let mut saw_batch_info = false;
    let mut saw_batch_before_progress = false;
    let mut saw_progress = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            ImportEvent::BatchInfo { enabled, batch_size, .. } => {
                saw_batch_info = true;
                assert!(enabled);
                assert_eq!(batch_size, 2);
                assert!(!saw_progress);
            }
            ImportEvent::BatchProgress { .. } => {
                saw_batch_before_progress = !saw_progress;
            }
            ImportEvent::Progress { .. } => {
                saw_progress = true;
            }
            _ => {}
        }
    }
    assert!(saw_batch_info);
    assert!(saw_batch_before_progress);
}

#[tokio::test]
async fn accepted_ai_classification_assigns_and_stamps() {
    let fx = harness().await;
    fx.catalog.create_category("Toys", 0, "toys").await.unwrap();

    let config = ClassifierConfig {
        enabled: true,
        api_token: Some("hf_test".into()),
        skip_reclassify: false,
        ..Default::default()
    };

    let transport = Arc::new(ScriptedTransport {
        replies: std::sync::Mutex::new(vec![
            ok_reply(r#"[{"label":"Toys","score":0.9}]"#),
            ok_reply(r#"[{"label":"Toys","score":0.82},{"label":"Games","score":0.1}]"#),
        ]),
    });
    let classifier =
        ZeroShotClassifierClient::with_transport(config.clone(), transport);

    let csv = write_csv("TITLE,PRICE\nWooden Blocks,9.00\n");
    let mut session = ImportSession::new(
        csv.path().display().to_string(),
        ImportOptions {
            use_ai: true,
            ..Default::default()
        },
    );

    fx.controller(config)
        .with_classifier(classifier)
        .run(&mut session)
        .await
        .unwrap();

    let id = fx
        .catalog
        .find_by_exact_title("Wooden Blocks")
        .await
        .unwrap()
        .unwrap();
    let assigned = fx.catalog.categories_for_product(id).await.unwrap();
    assert_eq!(assigned[0].name, "Toys");
    assert_eq!(
        fx.meta.get_meta(id, meta_keys::AI_CATEGORIZED).await.unwrap(),
        Some("yes".to_string())
    );
}

#[tokio::test]
async fn structural_failure_emits_error_then_empty_complete() {
    let fx = harness().await;

    let csv = write_csv("NAME,PRICE\nNot Importable,1.00\n");
    let mut rx = fx.events.subscribe();
    let session = fx.run(&csv, ImportOptions::default()).await;

    assert_eq!(session.state, ImportState::Failed);
    assert_eq!(fx.product_count().await, 0);

    let mut order = Vec::new();
    while let Ok(event) = rx.try_recv() {
        order.push(event.event_type());
    }
    assert!(order.contains(&"error"));
    assert_eq!(*order.last().unwrap(), "complete");
}
