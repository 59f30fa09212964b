//! In-process event bus between the pipeline and any attached presenter.
//!
//! Delivery is best-effort: the presenter may not be attached (e.g. a
//! headless run), and a publish with no subscriber is never an error. The
//! store, not the bus, is the source of truth for note state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::Note;

/// Push notifications emitted by the segment pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    /// A note was summarized and persisted locally
    NewNote { note: Note },

    /// The note with this timestamp was appended to the remote container
    NoteSaved { timestamp: String },

    /// A segment pipeline failed before producing a note
    Error { message: String },

    /// The remote save failed; the note is still valid locally
    SinkError { message: String },
}

/// Publisher seam injected into the pipeline
pub trait EventBus: Send + Sync {
    fn publish(&self, event: UiEvent);
}

/// Broadcast-channel bus; every subscriber sees every event
pub struct BroadcastBus {
    tx: broadcast::Sender<UiEvent>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(capacity);
        Arc::new(Self { tx })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: UiEvent) {
        // No subscriber means the presenter is closed; drop the event
        if self.tx.send(event).is_err() {
            debug!("Event published with no subscriber attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscriber_does_not_panic() {
        let bus = BroadcastBus::new(8);
        bus.publish(UiEvent::Error {
            message: "nobody listening".to_string(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = BroadcastBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(UiEvent::NoteSaved {
            timestamp: "12:00:00".to_string(),
        });

        match rx.recv().await.unwrap() {
            UiEvent::NoteSaved { timestamp } => assert_eq!(timestamp, "12:00:00"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_tags_are_stable() {
        let json = serde_json::to_string(&UiEvent::NoteSaved {
            timestamp: "12:00:00".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"noteSaved""#));
    }
}
