//! Zero-shot classifier client
//!
//! Wraps a remote zero-shot classification endpoint (Hugging Face
//! inference-style API). The model is a cold-starting, rate-sensitive
//! service, so the client favors latency safety over throughput: a dedicated
//! warmup request absorbs cold-start 503s, items go out in small fixed-size
//! batches, and successive calls are paced with fixed delays.
//!
//! Classifier unavailability is never fatal: failed or low-confidence items
//! come back unresolved and fall through to keyword matching downstream.

use crate::models::{ClassificationResult, ClassificationSource, ProductRecord};
use crate::services::retry_policy::run_with_retries;
use crate::services::tag_tokenizer::dedup_tokens;
use async_trait::async_trait;
use restock_common::events::{EventBus, ImportEvent, LogSeverity};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default classification endpoint (zero-shot NLI model)
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";

/// Items per classification batch. Deliberately small: favors timeout
/// safety over throughput on a cold-starting service.
pub const CLASSIFY_BATCH_SIZE: usize = 2;

/// Minimum top-label score for an assignment to be accepted
pub const AI_SCORE_THRESHOLD: f64 = 0.20;

/// Labels sent with the warmup request, at most
const WARMUP_LABEL_LIMIT: usize = 3;

/// How many top candidates are logged when the score is below threshold
const LOW_CONFIDENCE_LOG_LIMIT: usize = 3;

/// Read-only classifier configuration, resolved once per run and injected.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub enabled: bool,
    pub skip_reclassify: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            api_token: None,
            enabled: false,
            skip_reclassify: true,
        }
    }
}

impl ClassifierConfig {
    /// Whether remote classification can run at all
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self
                .api_token
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Timing knobs; defaults are the production contract values.
#[derive(Debug, Clone)]
pub struct ClientTuning {
    /// Per-call HTTP timeout, generous enough to absorb residual cold start
    pub request_timeout: Duration,
    /// Warmup attempts before proceeding degraded
    pub warmup_attempts: u32,
    /// Warmup pause after a non-503 failure
    pub warmup_error_pause: Duration,
    /// Cap on the server-estimated cold-start wait honored during warmup
    pub warmup_max_loading_wait: Duration,
    /// Per-item attempts including the first call
    pub item_attempts: u32,
    /// Pause after a transport error
    pub transport_pause: Duration,
    /// Pause after a 503 (model still loading)
    pub loading_pause: Duration,
    /// Delay between successive items within a batch
    pub intra_batch_delay: Duration,
    /// Pause between batches
    pub inter_batch_pause: Duration,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            warmup_attempts: 5,
            warmup_error_pause: Duration::from_secs(3),
            warmup_max_loading_wait: Duration::from_secs(30),
            item_attempts: 3,
            transport_pause: Duration::from_secs(2),
            loading_pause: Duration::from_secs(5),
            intra_batch_delay: Duration::from_millis(500),
            inter_batch_pause: Duration::from_secs(1),
        }
    }
}

impl ClientTuning {
    /// Zero pauses, for tests
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            request_timeout: Duration::from_secs(1),
            warmup_attempts: 2,
            warmup_error_pause: Duration::ZERO,
            warmup_max_loading_wait: Duration::ZERO,
            item_attempts: 3,
            transport_pause: Duration::ZERO,
            loading_pause: Duration::ZERO,
            intra_batch_delay: Duration::ZERO,
            inter_batch_pause: Duration::ZERO,
        }
    }
}

/// Classifier client errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("network error: {0}")]
    Network(String),

    #[error("model loading (estimated {estimated_seconds:.0}s)")]
    ModelLoading { estimated_seconds: f64 },

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Raw HTTP reply as seen by the client
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Transport seam; production uses reqwest, tests substitute a fake.
#[async_trait]
pub trait ClassifierTransport: Send + Sync {
    async fn post(&self, body: &serde_json::Value) -> Result<HttpReply, ClassifyError>;
}

struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

#[async_trait]
impl ClassifierTransport for HttpTransport {
    async fn post(&self, body: &serde_json::Value) -> Result<HttpReply, ClassifyError> {
        let mut request = self.http.post(&self.endpoint).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}

/// Source of prior AI category assignments for the skip-reclassify mode.
///
/// Implemented over the catalog + metadata stores: a matching existing
/// product flagged as AI-categorized yields its current category name.
#[async_trait]
pub trait PriorAssignments: Send + Sync {
    async fn prior_ai_category(&self, record: &ProductRecord) -> Option<String>;
}

/// One label/score pair from the classification response
#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// 503 body shape while the model loads
#[derive(Debug, Deserialize)]
struct LoadingBody {
    #[allow(dead_code)]
    error: Option<String>,
    estimated_time: Option<f64>,
}

/// Default cold-start estimate when the server does not provide one
const DEFAULT_LOADING_ESTIMATE: f64 = 20.0;

/// Batched, retried, rate-aware zero-shot classification client
pub struct ZeroShotClassifierClient {
    transport: Arc<dyn ClassifierTransport>,
    config: ClassifierConfig,
    tuning: ClientTuning,
    prior: Option<Arc<dyn PriorAssignments>>,
    events: Option<EventBus>,
}

impl ZeroShotClassifierClient {
    pub fn new(config: ClassifierConfig) -> Self {
        let tuning = ClientTuning::default();
        let http = reqwest::Client::builder()
            .timeout(tuning.request_timeout)
            .build()
            .unwrap_or_default();
        let transport = Arc::new(HttpTransport {
            http,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        });
        Self {
            transport,
            config,
            tuning,
            prior: None,
            events: None,
        }
    }

    /// Client with a custom transport (tests)
    pub fn with_transport(config: ClassifierConfig, transport: Arc<dyn ClassifierTransport>) -> Self {
        Self {
            transport,
            config,
            tuning: ClientTuning::default(),
            prior: None,
            events: None,
        }
    }

    pub fn with_tuning(mut self, tuning: ClientTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_prior(mut self, prior: Arc<dyn PriorAssignments>) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Warm the remote model before the first batch.
    ///
    /// Uses a minimal synthetic input and at most the first three candidate
    /// labels. On 503 sleeps for the server-estimated load time (capped),
    /// on other failures a fixed pause; proceeds degraded after exhausting
    /// attempts. Never fails the run.
    pub async fn warmup(&self, labels: &[String]) {
        let warm_labels: Vec<String> = labels.iter().take(WARMUP_LABEL_LIMIT).cloned().collect();
        let max_loading_wait = self.tuning.warmup_max_loading_wait.as_secs_f64();

        let outcome = run_with_retries(
            "classifier warmup",
            self.tuning.warmup_attempts,
            |err: &ClassifyError| match err {
                ClassifyError::ModelLoading { estimated_seconds } => Some(
                    Duration::from_secs_f64(estimated_seconds.min(max_loading_wait).max(0.0)),
                ),
                _ => Some(self.tuning.warmup_error_pause),
            },
            || self.request("warmup", &warm_labels),
        )
        .await;

        match outcome {
            Ok(_) => info!("Classifier warmup complete"),
            Err(err) => warn!(error = %err, "Classifier warmup failed, proceeding degraded"),
        }
    }

    /// Classify a slice of product rows, returning results keyed by index
    /// into the slice.
    ///
    /// Handles warmup, fixed-size batching, inter-call pacing, the
    /// skip-already-AI-categorized mode, and per-item retries. Missing
    /// credentials or an empty label list yield an empty map so the keyword
    /// path can take over.
    pub async fn classify_batch(
        &self,
        records: &[ProductRecord],
        labels: &[String],
    ) -> HashMap<usize, ClassificationResult> {
        let mut results = HashMap::new();

        if !self.config.is_usable() {
            warn!("Classifier not configured; skipping AI classification");
            return results;
        }
        if labels.is_empty() {
            warn!("No candidate categories; skipping AI classification");
            return results;
        }

        let candidates: Vec<(usize, &ProductRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_title())
            .collect();
        if candidates.is_empty() {
            return results;
        }

        let total_batches = candidates.len().div_ceil(CLASSIFY_BATCH_SIZE);
        self.emit(ImportEvent::BatchInfo {
            enabled: true,
            batch_size: CLASSIFY_BATCH_SIZE,
            total_batches,
        });

        self.warmup(labels).await;

        for (batch_idx, chunk) in candidates.chunks(CLASSIFY_BATCH_SIZE).enumerate() {
            self.emit(ImportEvent::BatchProgress {
                current_batch: batch_idx + 1,
                total_batches,
            });
            debug!(
                batch = batch_idx + 1,
                total_batches,
                items = chunk.len(),
                "Classifying batch"
            );

            for (pos, &(row_idx, record)) in chunk.iter().enumerate() {
                if pos > 0 {
                    tokio::time::sleep(self.tuning.intra_batch_delay).await;
                }

                let result = self.classify_record(record, labels).await;
                results.insert(row_idx, result);
            }

            if batch_idx + 1 < total_batches {
                tokio::time::sleep(self.tuning.inter_batch_pause).await;
            }
        }

        results
    }

    /// Classify one record, honoring the skip-reclassify mode.
    pub async fn classify_record(
        &self,
        record: &ProductRecord,
        labels: &[String],
    ) -> ClassificationResult {
        if self.config.skip_reclassify {
            if let Some(prior) = &self.prior {
                if let Some(category) = prior.prior_ai_category(record).await {
                    debug!(title = %record.title, category = %category, "Reusing prior AI category");
                    let mut result = ClassificationResult::resolved(
                        category.clone(),
                        1.0,
                        ClassificationSource::Ai,
                    )
                    .with_trace(
                        LogSeverity::Ai,
                        format!("Reusing existing AI category '{}'", category),
                    );
                    result.reused = true;
                    return result;
                }
            }
        }

        let prompt = build_prompt(record);
        let outcome = run_with_retries(
            "classification request",
            self.tuning.item_attempts,
            |err: &ClassifyError| match err {
                ClassifyError::Network(_) => Some(self.tuning.transport_pause),
                ClassifyError::ModelLoading { .. } => Some(self.tuning.loading_pause),
                // Other non-200 statuses and malformed bodies are not retried
                ClassifyError::Api(..) | ClassifyError::Parse(_) => None,
            },
            || self.request(&prompt, labels),
        )
        .await;

        match outcome {
            Ok(mut scores) => {
                scores.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let Some(top) = scores.first() else {
                    return ClassificationResult::unresolved()
                        .with_trace(LogSeverity::Warning, "Classifier returned no labels");
                };

                if top.score >= AI_SCORE_THRESHOLD {
                    ClassificationResult::resolved(
                        top.label.clone(),
                        top.score,
                        ClassificationSource::Ai,
                    )
                    .with_trace(
                        LogSeverity::Ai,
                        format!("AI classified as '{}' ({:.2})", top.label, top.score),
                    )
                } else {
                    let top_scores: Vec<String> = scores
                        .iter()
                        .take(LOW_CONFIDENCE_LOG_LIMIT)
                        .map(|s| format!("{} ({:.2})", s.label, s.score))
                        .collect();
                    ClassificationResult::unresolved().with_trace(
                        LogSeverity::Ai,
                        format!(
                            "AI confidence below {:.2}; top candidates: {}",
                            AI_SCORE_THRESHOLD,
                            top_scores.join(", ")
                        ),
                    )
                }
            }
            Err(err) => {
                warn!(title = %record.title, error = %err, "AI classification failed");
                ClassificationResult::unresolved().with_trace(
                    LogSeverity::Warning,
                    format!("AI classification failed: {}", err),
                )
            }
        }
    }

    async fn request(
        &self,
        inputs: &str,
        labels: &[String],
    ) -> Result<Vec<LabelScore>, ClassifyError> {
        // Labels are passed verbatim; exact names keep output matching clean
        let body = serde_json::json!({
            "inputs": inputs,
            "parameters": {
                "candidate_labels": labels,
                "multi_label": false,
            }
        });

        let reply = self.transport.post(&body).await?;
        parse_reply(reply)
    }

    fn emit(&self, event: ImportEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

/// Instruction string embedding the title and deduplicated tag tokens
fn build_prompt(record: &ProductRecord) -> String {
    let tokens = dedup_tokens(&record.tags);
    if tokens.is_empty() {
        format!("Classify this product listing: {}", record.title)
    } else {
        format!(
            "Classify this product listing: {}. Keywords: {}",
            record.title,
            tokens.join(", ")
        )
    }
}

fn parse_reply(reply: HttpReply) -> Result<Vec<LabelScore>, ClassifyError> {
    match reply.status {
        200 => serde_json::from_str::<Vec<LabelScore>>(&reply.body)
            .map_err(|e| ClassifyError::Parse(e.to_string())),
        503 => {
            let estimated_seconds = serde_json::from_str::<LoadingBody>(&reply.body)
                .ok()
                .and_then(|b| b.estimated_time)
                .unwrap_or(DEFAULT_LOADING_ESTIMATE);
            Err(ClassifyError::ModelLoading { estimated_seconds })
        }
        status => {
            let body: String = reply.body.chars().take(200).collect();
            Err(ClassifyError::Api(status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeTransport {
        replies: Mutex<VecDeque<Result<HttpReply, ClassifyError>>>,
        calls: AtomicUsize,
    }

    impl FakeTransport {
        fn new(replies: Vec<Result<HttpReply, ClassifyError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn ok(body: &str) -> Result<HttpReply, ClassifyError> {
            Ok(HttpReply {
                status: 200,
                body: body.to_string(),
            })
        }

        fn status(status: u16, body: &str) -> Result<HttpReply, ClassifyError> {
            Ok(HttpReply {
                status,
                body: body.to_string(),
            })
        }
    }

    #[async_trait]
    impl ClassifierTransport for FakeTransport {
        async fn post(&self, _body: &serde_json::Value) -> Result<HttpReply, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| FakeTransport::ok("[]"))
        }
    }

    fn usable_config() -> ClassifierConfig {
        ClassifierConfig {
            enabled: true,
            api_token: Some("hf_test".into()),
            skip_reclassify: false,
            ..Default::default()
        }
    }

    fn record(title: &str, tags: &[&str]) -> ProductRecord {
        ProductRecord {
            title: title.to_string(),
            description: String::new(),
            price: 0.0,
            sku: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image_urls: vec![],
            taxonomy_path: None,
            quantity: None,
            listing_ref: None,
        }
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn unconfigured_client_returns_empty_map_without_calls() {
        let transport = FakeTransport::new(vec![]);
        let client = ZeroShotClassifierClient::with_transport(
            ClassifierConfig::default(),
            transport.clone(),
        );

        let results = client
            .classify_batch(&[record("Mug", &[])], &labels(&["Kitchen"]))
            .await;
        assert!(results.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_label_list_is_non_fatal() {
        let transport = FakeTransport::new(vec![]);
        let client =
            ZeroShotClassifierClient::with_transport(usable_config(), transport.clone());

        let results = client.classify_batch(&[record("Mug", &[])], &[]).await;
        assert!(results.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn top_label_above_threshold_is_accepted() {
        let transport = FakeTransport::new(vec![
            // warmup
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#),
            // item
            FakeTransport::ok(r#"[{"label":"Toys","score":0.85},{"label":"Games","score":0.10}]"#),
        ]);
        let client = ZeroShotClassifierClient::with_transport(usable_config(), transport)
            .with_tuning(ClientTuning::immediate());

        let results = client
            .classify_batch(
                &[record("Wooden blocks", &["toys"])],
                &labels(&["Toys", "Games"]),
            )
            .await;

        let result = &results[&0];
        assert_eq!(result.category.as_deref(), Some("Toys"));
        assert_eq!(result.source, ClassificationSource::Ai);
        assert!((result.confidence - 0.85).abs() < 1e-9);
        assert!(!result.reused);
    }

    #[tokio::test]
    async fn below_threshold_is_unresolved_with_top_scores_logged() {
        let transport = FakeTransport::new(vec![
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#), // warmup
            FakeTransport::ok(r#"[{"label":"Toys","score":0.15}]"#),
        ]);
        let client = ZeroShotClassifierClient::with_transport(usable_config(), transport)
            .with_tuning(ClientTuning::immediate());

        let results = client
            .classify_batch(&[record("Mystery item", &[])], &labels(&["Toys"]))
            .await;

        let result = &results[&0];
        assert!(!result.is_resolved());
        let trace = result.trace.last().unwrap();
        assert_eq!(trace.severity, LogSeverity::Ai);
        assert!(trace.message.contains("Toys (0.15)"));
    }

    #[tokio::test]
    async fn cold_start_503_retries_then_succeeds() {
        let transport = FakeTransport::new(vec![
            // warmup: loading twice, then ready
            FakeTransport::status(503, r#"{"error":"loading","estimated_time":0.0}"#),
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#),
            // item: one more 503, then the answer
            FakeTransport::status(503, r#"{"error":"loading"}"#),
            FakeTransport::ok(r#"[{"label":"Toys","score":0.8}]"#),
        ]);
        let client = ZeroShotClassifierClient::with_transport(usable_config(), transport.clone())
            .with_tuning(ClientTuning::immediate());

        let results = client
            .classify_batch(&[record("Blocks", &[])], &labels(&["Toys"]))
            .await;

        assert_eq!(results[&0].category.as_deref(), Some("Toys"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn other_api_errors_leave_item_unclassified_without_retry() {
        let transport = FakeTransport::new(vec![
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#), // warmup
            FakeTransport::status(400, r#"{"error":"bad request"}"#),
        ]);
        let client = ZeroShotClassifierClient::with_transport(usable_config(), transport.clone())
            .with_tuning(ClientTuning::immediate());

        let results = client
            .classify_batch(&[record("Blocks", &[])], &labels(&["Toys"]))
            .await;

        assert!(!results[&0].is_resolved());
        // warmup + single item attempt, no retries on a 400
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_errors_are_retried_then_degrade() {
        let transport = FakeTransport::new(vec![
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#), // warmup
            Err(ClassifyError::Network("refused".into())),
            Err(ClassifyError::Network("refused".into())),
            Err(ClassifyError::Network("refused".into())),
        ]);
        let client = ZeroShotClassifierClient::with_transport(usable_config(), transport.clone())
            .with_tuning(ClientTuning::immediate());

        let results = client
            .classify_batch(&[record("Blocks", &[])], &labels(&["Toys"]))
            .await;

        assert!(!results[&0].is_resolved());
        // warmup + 3 item attempts (initial + 2 retries)
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn skip_reclassify_reuses_prior_assignment() {
        struct FixedPrior;
        #[async_trait]
        impl PriorAssignments for FixedPrior {
            async fn prior_ai_category(&self, _record: &ProductRecord) -> Option<String> {
                Some("Toys".to_string())
            }
        }

        let transport = FakeTransport::new(vec![
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#), // warmup only
        ]);
        let mut config = usable_config();
        config.skip_reclassify = true;
        let client = ZeroShotClassifierClient::with_transport(config, transport.clone())
            .with_tuning(ClientTuning::immediate())
            .with_prior(Arc::new(FixedPrior));

        let results = client
            .classify_batch(&[record("Blocks", &[])], &labels(&["Toys"]))
            .await;

        let result = &results[&0];
        assert!(result.reused);
        assert_eq!(result.category.as_deref(), Some("Toys"));
        // only the warmup hit the network
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rows_without_title_are_not_sent() {
        let transport = FakeTransport::new(vec![
            FakeTransport::ok(r#"[{"label":"Toys","score":0.9}]"#), // warmup
            FakeTransport::ok(r#"[{"label":"Toys","score":0.8}]"#),
        ]);
        let client = ZeroShotClassifierClient::with_transport(usable_config(), transport)
            .with_tuning(ClientTuning::immediate());

        let rows = vec![record("", &[]), record("Blocks", &[])];
        let results = client.classify_batch(&rows, &labels(&["Toys"])).await;

        assert!(!results.contains_key(&0));
        assert!(results.contains_key(&1));
    }

    #[test]
    fn prompt_embeds_title_and_deduplicated_tokens() {
        let prompt = build_prompt(&record(
            "Baby Shower Bingo",
            &["baby_shower", "shower game", "baby"],
        ));
        assert!(prompt.contains("Baby Shower Bingo"));
        assert!(prompt.contains("baby, shower, game"));
    }

    #[test]
    fn parse_reply_handles_loading_and_errors() {
        let loading = parse_reply(HttpReply {
            status: 503,
            body: r#"{"error":"loading","estimated_time":12.5}"#.into(),
        })
        .unwrap_err();
        match loading {
            ClassifyError::ModelLoading { estimated_seconds } => {
                assert!((estimated_seconds - 12.5).abs() < 1e-9)
            }
            other => panic!("expected ModelLoading, got {:?}", other),
        }

        let api = parse_reply(HttpReply {
            status: 401,
            body: "unauthorized".into(),
        })
        .unwrap_err();
        assert!(matches!(api, ClassifyError::Api(401, _)));

        let garbled = parse_reply(HttpReply {
            status: 200,
            body: "not json".into(),
        })
        .unwrap_err();
        assert!(matches!(garbled, ClassifyError::Parse(_)));
    }
}
