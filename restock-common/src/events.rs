//! Event types for the Restock import stream
//!
//! Provides the shared import event definitions and the EventBus used to
//! broadcast them to SSE clients. Events are emitted in row-processing order
//! and serialized with a `type` tag for SSE transmission.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity tag attached to streamed log lines.
///
/// `Ai` marks trace lines produced by the remote zero-shot classifier so the
/// consumer can render them distinctly from ordinary info lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Success,
    Error,
    Ai,
}

/// Import stream events.
///
/// One event per significant step of an import run. Progress events are
/// strictly monotonic and match row-processing order; classification batch
/// events precede the per-row events for rows in that batch. Catalog
/// mutations are durable before the corresponding event is emitted, so a
/// disconnected consumer loses only visibility, never data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// Import run accepted and started
    SessionStarted {
        session_id: Uuid,
        file: String,
    },

    /// Human-readable log line (classification traces, row outcomes)
    Log {
        severity: LogSeverity,
        message: String,
    },

    /// Row-processing progress fraction
    Progress {
        current: usize,
        total: usize,
        percent: f64,
    },

    /// Pre-classification batching parameters (AI mode only)
    BatchInfo {
        enabled: bool,
        batch_size: usize,
        total_batches: usize,
    },

    /// Classification batch about to be sent (AI mode only)
    BatchProgress {
        current_batch: usize,
        total_batches: usize,
    },

    /// Non-fatal row- or API-scoped error
    Error {
        message: String,
    },

    /// Final aggregate summary, emitted exactly once per run
    Complete {
        imported: usize,
        updated: usize,
        skipped: usize,
        errors: Vec<String>,
        images_queued: usize,
        categories_created: usize,
        duration_text: String,
    },

    /// Import run aborted with a structural error
    SessionFailed {
        session_id: Uuid,
        message: String,
    },
}

impl ImportEvent {
    /// Event type string as used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ImportEvent::SessionStarted { .. } => "session_started",
            ImportEvent::Log { .. } => "log",
            ImportEvent::Progress { .. } => "progress",
            ImportEvent::BatchInfo { .. } => "batch_info",
            ImportEvent::BatchProgress { .. } => "batch_progress",
            ImportEvent::Error { .. } => "error",
            ImportEvent::Complete { .. } => "complete",
            ImportEvent::SessionFailed { .. } => "session_failed",
        }
    }
}

/// Broadcast bus for import events.
///
/// Wraps a tokio broadcast channel. Emission never blocks and never fails:
/// with no subscribers the event is simply dropped, which is the correct
/// behavior for a progress stream (the catalog mutations are already
/// durable by the time the event is emitted).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    ///
    /// Older events are dropped for lagging subscribers once the buffer
    /// fills; slow SSE consumers observe a lag error, not a stalled import.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers, returning the receiver count.
    pub fn emit(&self, event: ImportEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(tokio::sync::broadcast::error::SendError(event)) => {
                // No receivers - fine for a progress stream
                tracing::debug!(event_type = event.event_type(), "No event subscribers");
                0
            }
        }
    }

    /// Configured channel capacity (for diagnostics)
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_lossy_not_fatal() {
        let bus = EventBus::new(16);
        let delivered = bus.emit(ImportEvent::Progress {
            current: 1,
            total: 10,
            percent: 10.0,
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(ImportEvent::Log {
            severity: LogSeverity::Info,
            message: "first".into(),
        });
        bus.emit(ImportEvent::Log {
            severity: LogSeverity::Success,
            message: "second".into(),
        });

        match rx.recv().await.unwrap() {
            ImportEvent::Log { message, .. } => assert_eq!(message, "first"),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            ImportEvent::Log { message, .. } => assert_eq!(message, "second"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn events_serialize_with_snake_case_type_tag() {
        let event = ImportEvent::BatchInfo {
            enabled: true,
            batch_size: 2,
            total_batches: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_info");
        assert_eq!(json["batch_size"], 2);

        let log = ImportEvent::Log {
            severity: LogSeverity::Ai,
            message: "classified".into(),
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["type"], "log");
        assert_eq!(json["severity"], "ai");
    }

    #[test]
    fn event_type_matches_serialized_tag() {
        let event = ImportEvent::Complete {
            imported: 1,
            updated: 2,
            skipped: 0,
            errors: vec![],
            images_queued: 3,
            categories_created: 1,
            duration_text: "5.00s".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }
}
