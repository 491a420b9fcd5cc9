//! Event types for the Horarium event system
//!
//! Extraction progress is broadcast on an in-process EventBus and forwarded
//! to SSE subscribers by the extraction service. Events are advisory: a
//! dropped event never affects the stored audit trail.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Horarium event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HorariumEvent {
    /// A scheduled or triggered extraction batch started
    BatchStarted {
        batch_id: Uuid,
        parish_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One parish finished extraction (any terminal validation status)
    ParishExtracted {
        parish_id: Uuid,
        tier: u8,
        confidence: f64,
        status: String,
        entry_count: usize,
    },

    /// One parish failed with a contained error; the batch continues
    ParishFailed {
        parish_id: Uuid,
        error: String,
    },

    /// Batch finished
    BatchCompleted {
        batch_id: Uuid,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },

    /// An out-of-cycle extraction was enqueued for one parish
    ExtractionTriggered {
        parish_id: Uuid,
    },

    /// A user report was submitted
    ReportSubmitted {
        parish_id: Uuid,
        report_id: Uuid,
    },
}

impl HorariumEvent {
    /// SSE event name for this variant
    pub fn event_type(&self) -> &'static str {
        match self {
            HorariumEvent::BatchStarted { .. } => "batch_started",
            HorariumEvent::ParishExtracted { .. } => "parish_extracted",
            HorariumEvent::ParishFailed { .. } => "parish_failed",
            HorariumEvent::BatchCompleted { .. } => "batch_completed",
            HorariumEvent::ExtractionTriggered { .. } => "extraction_triggered",
            HorariumEvent::ReportSubmitted { .. } => "report_submitted",
        }
    }
}

/// Broadcast bus for HorariumEvent
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HorariumEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Old events are dropped once the buffer fills; subscribers that lag
    /// receive a `Lagged` error and resume from the current position.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<HorariumEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the subscriber count; zero subscribers is not an error.
    pub fn emit(&self, event: HorariumEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let parish_id = Uuid::new_v4();
        bus.emit(HorariumEvent::ExtractionTriggered { parish_id });

        match rx.recv().await.unwrap() {
            HorariumEvent::ExtractionTriggered { parish_id: got } => {
                assert_eq!(got, parish_id);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(16);
        let count = bus.emit(HorariumEvent::ExtractionTriggered {
            parish_id: Uuid::new_v4(),
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn test_event_serialization_tags() {
        let event = HorariumEvent::ParishFailed {
            parish_id: Uuid::new_v4(),
            error: "timeout".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"parish_failed\""));
        assert_eq!(event.event_type(), "parish_failed");
    }
}
