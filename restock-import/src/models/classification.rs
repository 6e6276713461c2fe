//! Classification result carried from the classifiers to the reconciler

use restock_common::events::LogSeverity;
use serde::{Deserialize, Serialize};

/// Which strategy produced the result.
///
/// `Unresolved` is an explicit variant: "not attempted" and "attempted but
/// below threshold" both land here, with the trace telling them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Ai,
    Keyword,
    Unresolved,
}

/// One human-readable trace entry, surfaced to the event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub severity: LogSeverity,
    pub message: String,
}

/// Outcome of classifying one product row.
///
/// Produced once per product per import attempt; folded into product
/// metadata rather than persisted as its own entity. On the AI path
/// `confidence` is the model score (0.0-1.0); on the keyword path it is the
/// raw additive match score, not a probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Matched category name; None when unresolved
    pub category: Option<String>,
    /// AI score or raw keyword score, depending on `source`
    pub confidence: f64,
    /// Strategy that produced the category
    pub source: ClassificationSource,
    /// True when an existing product's prior AI assignment was reused
    pub reused: bool,
    /// Ordered trace of classification decisions
    pub trace: Vec<TraceEntry>,
}

impl ClassificationResult {
    /// Result with a resolved category.
    pub fn resolved(category: impl Into<String>, confidence: f64, source: ClassificationSource) -> Self {
        Self {
            category: Some(category.into()),
            confidence,
            source,
            reused: false,
            trace: Vec::new(),
        }
    }

    /// Result with no category assignment.
    pub fn unresolved() -> Self {
        Self {
            category: None,
            confidence: 0.0,
            source: ClassificationSource::Unresolved,
            reused: false,
            trace: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.category.is_some()
    }

    /// Append a trace entry, builder-style.
    pub fn with_trace(mut self, severity: LogSeverity, message: impl Into<String>) -> Self {
        self.trace.push(TraceEntry {
            severity,
            message: message.into(),
        });
        self
    }

    /// Append a trace entry in place.
    pub fn push_trace(&mut self, severity: LogSeverity, message: impl Into<String>) {
        self.trace.push(TraceEntry {
            severity,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_has_no_category_and_zero_confidence() {
        let result = ClassificationResult::unresolved();
        assert!(!result.is_resolved());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, ClassificationSource::Unresolved);
        assert!(!result.reused);
    }

    #[test]
    fn resolved_carries_source_and_trace() {
        let result = ClassificationResult::resolved("Toys", 0.82, ClassificationSource::Ai)
            .with_trace(LogSeverity::Ai, "AI classified as Toys (0.82)");
        assert!(result.is_resolved());
        assert_eq!(result.category.as_deref(), Some("Toys"));
        assert_eq!(result.trace.len(), 1);
        assert_eq!(result.trace[0].severity, LogSeverity::Ai);
    }
}
