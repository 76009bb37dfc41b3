//! Application events and the typed event bus.
//!
//! Every state change the rest of the application cares about is an
//! [`Event`] published on the [`EventBus`]. View code subscribes instead
//! of being called back directly, which keeps the core free of display
//! concerns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::SessionKind;

/// Every state change in the system produces an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        kind: SessionKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        kind: SessionKind,
        /// Whether the user ended the session before the countdown elapsed.
        manual: bool,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// Backend became reachable again.
    ConnectivityRestored {
        at: DateTime<Utc>,
    },
    /// Backend became unreachable; writes queue locally.
    ConnectivityLost {
        at: DateTime<Utc>,
    },
    /// A sync pass finished.
    SyncCompleted {
        replayed: usize,
        failed: usize,
        dead_lettered: usize,
        at: DateTime<Utc>,
    },
    /// A queued operation failed permanently and was moved aside.
    OperationDeadLettered {
        operation_id: String,
        path: String,
        at: DateTime<Utc>,
    },
    /// The RC-cell balance changed.
    BalanceUpdated {
        user_id: String,
        balance: i64,
        at: DateTime<Utc>,
    },
}

/// Broadcast bus with explicit subscribers.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(Event::ConnectivityLost { at: Utc::now() });
        match rx.recv().await.unwrap() {
            Event::ConnectivityLost { .. } => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(Event::ConnectivityRestored { at: Utc::now() });
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(Event::SyncCompleted {
            replayed: 3,
            failed: 1,
            dead_lettered: 0,
            at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["type"], "SyncCompleted");
        assert_eq!(json["replayed"], 3);
    }
}
