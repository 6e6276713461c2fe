//! Import session state machine
//!
//! A session progresses Parsing → Classifying → Reconciling → Completed,
//! with Cancelled and Failed as the other terminal states. Sessions live in
//! memory for the duration of the streamed run and are discarded afterwards;
//! the completion event carries the summary to the caller.

use crate::models::{ImportOptions, ImportSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Import workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportState {
    /// Header decoding and row parsing
    Parsing,
    /// Pre-classification batches against the remote classifier
    Classifying,
    /// Per-row reconciliation against the catalog
    Reconciling,
    /// Import finished
    Completed,
    /// Import cancelled by the caller
    Cancelled,
    /// Import aborted with a structural error
    Failed,
}

/// Progress tracking for the status endpoint and progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgress {
    /// Rows processed so far
    pub current: usize,
    /// Total rows in the file
    pub total: usize,
    /// Percentage complete (0.0 - 100.0)
    pub percent: f64,
    /// Current operation description
    pub current_operation: String,
    /// Elapsed time (seconds)
    pub elapsed_seconds: u64,
}

impl Default for ImportProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            percent: 0.0,
            current_operation: String::from("Initializing..."),
            elapsed_seconds: 0,
        }
    }
}

/// In-memory import session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    /// Unique session identifier
    pub session_id: Uuid,
    /// CSV file being imported
    pub csv_path: String,
    /// Parsed option set for this run
    pub options: ImportOptions,
    /// Current workflow state
    pub state: ImportState,
    /// Progress tracking
    pub progress: ImportProgress,
    /// Running results accumulator
    pub summary: ImportSummary,
    /// Session start time
    pub started_at: DateTime<Utc>,
    /// Session end time (terminal states only)
    pub ended_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    pub fn new(csv_path: String, options: ImportOptions) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            csv_path,
            options,
            state: ImportState::Parsing,
            progress: ImportProgress::default(),
            summary: ImportSummary::default(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state, stamping the end time for terminal states.
    pub fn transition_to(&mut self, new_state: ImportState) {
        self.state = new_state;
        if matches!(
            new_state,
            ImportState::Completed | ImportState::Cancelled | ImportState::Failed
        ) {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Update row progress and the operation description.
    pub fn update_progress(&mut self, current: usize, total: usize, operation: String) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.percent = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation;
        self.progress.elapsed_seconds = self.elapsed_seconds();
    }

    /// Seconds since the session started (to the end time once terminal).
    pub fn elapsed_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0) as u64
    }

    /// Whether the session reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ImportState::Completed | ImportState::Cancelled | ImportState::Failed
        )
    }
}
