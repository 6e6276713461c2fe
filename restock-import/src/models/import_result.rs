//! Per-run result accumulator and row-scoped errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many error messages the completion event carries at most; the rest
/// are summarized by count.
pub const ERROR_SAMPLE_LIMIT: usize = 10;

/// One row- or API-scoped error recorded during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based CSV row number, when the error is row-scoped
    pub row: Option<usize>,
    /// Human-readable error message
    pub message: String,
    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
}

impl RowError {
    pub fn for_row(row: usize, message: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn run_scoped(message: impl Into<String>) -> Self {
        Self {
            row: None,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Running totals for one import pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Products created
    pub imported: usize,
    /// Existing products updated
    pub updated: usize,
    /// Rows skipped (missing title or row-scoped failure)
    pub skipped: usize,
    /// Errors encountered
    pub errors: Vec<RowError>,
    /// Background image fetch tasks enqueued
    pub images_queued: usize,
    /// Taxonomy nodes created during the run
    pub categories_created: usize,
    /// Elapsed run duration in seconds
    pub duration_seconds: u64,
}

impl ImportSummary {
    /// Bounded error message sample for the completion event.
    ///
    /// When more errors occurred than the bound, the last entry states how
    /// many were withheld.
    pub fn error_sample(&self) -> Vec<String> {
        let mut sample: Vec<String> = self
            .errors
            .iter()
            .take(ERROR_SAMPLE_LIMIT)
            .map(|e| match e.row {
                Some(row) => format!("Row {}: {}", row, e.message),
                None => e.message.clone(),
            })
            .collect();

        if self.errors.len() > ERROR_SAMPLE_LIMIT {
            sample.push(format!(
                "... and {} more errors",
                self.errors.len() - ERROR_SAMPLE_LIMIT
            ));
        }
        sample
    }
}
