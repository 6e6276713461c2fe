//! Session-level import orchestration
//!
//! Drives the full pass over a CSV: decode, optional AI pre-classification
//! in batches, strictly sequential per-row reconciliation in file order, and
//! a final aggregate summary. One logical worker per run; rows are never
//! processed in parallel because taxonomy creation is read-then-maybe-write
//! shared state and progress ordering must be deterministic.
//!
//! Every catalog mutation is awaited before the corresponding event is
//! emitted, so a consumer that disconnects mid-run loses visibility only,
//! never data.

use crate::models::{ClassificationResult, ImportSession, ImportState, RowError};
use crate::services::catalog_reconciler::{CatalogReconciler, RowOutcome, StoredAssignments};
use crate::services::csv_reader;
use crate::services::zero_shot_classifier::{ClassifierConfig, ZeroShotClassifierClient};
use crate::store::{AttachmentStore, CatalogStore, MetadataStore, TaskQueue};
use restock_common::events::{EventBus, ImportEvent, LogSeverity};
use restock_common::human_time::format_duration;
use restock_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Drives one import run end to end, emitting ordered progress events.
pub struct ImportStreamController {
    catalog: Arc<dyn CatalogStore>,
    meta: Arc<dyn MetadataStore>,
    attachments: Arc<dyn AttachmentStore>,
    queue: Arc<dyn TaskQueue>,
    classifier: ZeroShotClassifierClient,
    classifier_config: ClassifierConfig,
    events: EventBus,
    cancel: CancellationToken,
}

impl ImportStreamController {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        meta: Arc<dyn MetadataStore>,
        attachments: Arc<dyn AttachmentStore>,
        queue: Arc<dyn TaskQueue>,
        classifier_config: ClassifierConfig,
        events: EventBus,
        cancel: CancellationToken,
    ) -> Self {
        let classifier = ZeroShotClassifierClient::new(classifier_config.clone())
            .with_prior(Arc::new(StoredAssignments::new(
                catalog.clone(),
                meta.clone(),
            )))
            .with_events(events.clone());

        Self {
            catalog,
            meta,
            attachments,
            queue,
            classifier,
            classifier_config,
            events,
            cancel,
        }
    }

    /// Replace the classifier client (tests substitute a fake transport)
    pub fn with_classifier(mut self, classifier: ZeroShotClassifierClient) -> Self {
        self.classifier = classifier;
        self
    }

    /// Execute the complete import pass for a session.
    ///
    /// Structural failures (unreadable file, missing TITLE column) abort the
    /// run with one error event and an empty completion summary. Row-scoped
    /// failures are caught at the row boundary, counted as skipped, and the
    /// run continues.
    pub async fn run(&self, session: &mut ImportSession) -> Result<()> {
        let session_id = session.session_id;
        info!(
            session_id = %session_id,
            file = %session.csv_path,
            "Starting import run"
        );

        self.events.emit(ImportEvent::SessionStarted {
            session_id,
            file: session.csv_path.clone(),
        });

        // Phase 1: decode the whole row set up front (enables batching)
        session.update_progress(0, 0, "Reading CSV...".to_string());
        let records = match csv_reader::read_products(Path::new(&session.csv_path)) {
            Ok(records) => records,
            Err(err) => {
                let message = err.to_string();
                error!(session_id = %session_id, error = %message, "Structural import failure");

                session.summary.errors.push(RowError::run_scoped(message.clone()));
                session.transition_to(ImportState::Failed);
                session.summary.duration_seconds = session.elapsed_seconds();

                self.events.emit(ImportEvent::Error {
                    message: message.clone(),
                });
                self.events.emit(ImportEvent::SessionFailed {
                    session_id,
                    message,
                });
                self.emit_complete(session);
                return Ok(());
            }
        };

        let total = records.len();
        let categories_before = self.count_categories().await?;
        info!(session_id = %session_id, rows = total, "CSV decoded");

        // Phase 2: AI pre-classification, when enabled and configured
        let mut ai_results: HashMap<usize, ClassificationResult> = HashMap::new();
        if session.options.use_ai {
            if self.classifier_config.is_usable() {
                session.transition_to(ImportState::Classifying);
                session.update_progress(0, total, "Classifying products...".to_string());

                let terms = self
                    .catalog
                    .category_terms()
                    .await
                    .map_err(|e| Error::Internal(e.to_string()))?;
                let labels: Vec<String> = terms.into_iter().map(|t| t.name).collect();

                ai_results = self.classifier.classify_batch(&records, &labels).await;
                info!(
                    session_id = %session_id,
                    classified = ai_results.len(),
                    "Pre-classification complete"
                );
            } else {
                warn!(session_id = %session_id, "AI enabled but classifier not configured");
                self.events.emit(ImportEvent::Log {
                    severity: LogSeverity::Warning,
                    message: "AI classification enabled but no classifier credentials configured; \
                              falling back to keyword matching"
                        .to_string(),
                });
            }
        }

        // Phase 3: per-row reconciliation, strictly in file order
        session.transition_to(ImportState::Reconciling);
        let reconciler = CatalogReconciler::new(
            self.catalog.clone(),
            self.meta.clone(),
            self.attachments.clone(),
            self.queue.clone(),
            session.options.clone(),
        );

        for (idx, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(session_id = %session_id, row = idx, "Import cancelled");
                session.transition_to(ImportState::Cancelled);
                self.events.emit(ImportEvent::Log {
                    severity: LogSeverity::Warning,
                    message: "Import cancelled by caller".to_string(),
                });
                break;
            }

            let row_number = idx + 1;
            let display_title = if record.has_title() {
                record.title.clone()
            } else {
                "(untitled)".to_string()
            };
            self.events.emit(ImportEvent::Log {
                severity: LogSeverity::Info,
                message: format!("Processing row {}/{}: {}", row_number, total, display_title),
            });

            match reconciler.process(record, ai_results.remove(&idx)).await {
                Ok(result) => {
                    for entry in &result.classification.trace {
                        self.events.emit(ImportEvent::Log {
                            severity: entry.severity,
                            message: entry.message.clone(),
                        });
                    }

                    match result.outcome {
                        RowOutcome::Created {
                            product_id,
                            images_queued,
                        } => {
                            session.summary.imported += 1;
                            session.summary.images_queued += images_queued;
                            self.events.emit(ImportEvent::Log {
                                severity: LogSeverity::Success,
                                message: format!(
                                    "Created product #{} '{}' ({} images queued)",
                                    product_id, record.title, images_queued
                                ),
                            });
                        }
                        RowOutcome::Updated {
                            product_id,
                            images_queued,
                        } => {
                            session.summary.updated += 1;
                            session.summary.images_queued += images_queued;
                            self.events.emit(ImportEvent::Log {
                                severity: LogSeverity::Info,
                                message: format!(
                                    "Updated existing product #{} '{}' ({} images queued)",
                                    product_id, record.title, images_queued
                                ),
                            });
                        }
                        RowOutcome::Skipped { reason } => {
                            session.summary.skipped += 1;
                            self.events.emit(ImportEvent::Log {
                                severity: LogSeverity::Warning,
                                message: format!("Row {} skipped: {}", row_number, reason),
                            });
                        }
                    }
                }
                Err(err) => {
                    // Row boundary: record, count as skipped, keep going
                    warn!(
                        session_id = %session_id,
                        row = row_number,
                        error = %err,
                        "Row processing failed"
                    );
                    session.summary.skipped += 1;
                    session
                        .summary
                        .errors
                        .push(RowError::for_row(row_number, err.to_string()));
                    self.events.emit(ImportEvent::Error {
                        message: format!("Row {}: {}", row_number, err),
                    });
                }
            }

            session.update_progress(
                row_number,
                total,
                format!("Processed row {}/{}", row_number, total),
            );
            self.events.emit(ImportEvent::Progress {
                current: row_number,
                total,
                percent: session.progress.percent,
            });
        }

        // Phase 4: finalize
        let categories_after = self.count_categories().await?;
        session.summary.categories_created =
            (categories_after - categories_before).max(0) as usize;

        if !session.is_terminal() {
            session.transition_to(ImportState::Completed);
        }
        session.summary.duration_seconds = session.elapsed_seconds();

        info!(
            session_id = %session_id,
            imported = session.summary.imported,
            updated = session.summary.updated,
            skipped = session.summary.skipped,
            errors = session.summary.errors.len(),
            images_queued = session.summary.images_queued,
            categories_created = session.summary.categories_created,
            "Import run finished"
        );

        self.emit_complete(session);
        Ok(())
    }

    fn emit_complete(&self, session: &ImportSession) {
        self.events.emit(ImportEvent::Complete {
            imported: session.summary.imported,
            updated: session.summary.updated,
            skipped: session.summary.skipped,
            errors: session.summary.error_sample(),
            images_queued: session.summary.images_queued,
            categories_created: session.summary.categories_created,
            duration_text: format_duration(session.summary.duration_seconds as i64),
        });
    }

    async fn count_categories(&self) -> Result<i64> {
        self.catalog
            .count_categories()
            .await
            .map_err(|e| Error::Internal(e.to_string()))
    }
}
