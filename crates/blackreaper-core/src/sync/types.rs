//! Core types for offline synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// How a queued write is applied to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Replace the whole value at the path.
    Set,
    /// Merge fields into the value at the path.
    Update,
}

/// A write destined for the remote store, held locally until applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Unique, creation-time-ordered token.
    pub id: String,
    /// Target location in the remote store.
    pub path: String,
    /// The data to write.
    pub payload: Value,
    pub kind: OpKind,
    /// Ordering key for replay. Ties keep submission order (stable sort).
    pub enqueued_at: DateTime<Utc>,
    /// Failed replay attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Earliest time the next replay may be attempted.
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

/// A permanently-failed operation moved out of the active queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub operation: PendingOperation,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Outcome of an offline-tolerant write.
#[derive(Debug)]
pub enum WriteOutcome {
    /// Applied to the remote store immediately; the queued copy was drained.
    Applied { operation_id: String },
    /// Accepted for eventual delivery while offline.
    Queued { operation_id: String },
    /// The immediate attempt failed; the queued copy stays for retry.
    Failed {
        operation_id: String,
        error: StoreError,
    },
}

impl WriteOutcome {
    /// Whether the write was accepted (immediately or for later delivery).
    pub fn success(&self) -> bool {
        !matches!(self, WriteOutcome::Failed { .. })
    }

    /// Whether the write was deferred rather than confirmed.
    pub fn offline(&self) -> bool {
        matches!(self, WriteOutcome::Queued { .. })
    }

    pub fn operation_id(&self) -> &str {
        match self {
            WriteOutcome::Applied { operation_id }
            | WriteOutcome::Queued { operation_id }
            | WriteOutcome::Failed { operation_id, .. } => operation_id,
        }
    }
}

/// Outcome of an offline-tolerant read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Fresh data from the remote store.
    Live { data: Value },
    /// Data served from the local cache.
    Cached {
        data: Value,
        cached_at: DateTime<Utc>,
        /// Whether the cache was used because the backend is unreachable
        /// (as opposed to being fresh).
        offline: bool,
    },
    /// Live read succeeded but nothing exists at the path.
    Missing,
    /// No live data and no usable cache.
    Unavailable { error: StoreError },
}

impl ReadOutcome {
    pub fn success(&self) -> bool {
        !matches!(self, ReadOutcome::Unavailable { .. })
    }

    pub fn cached(&self) -> bool {
        matches!(self, ReadOutcome::Cached { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ReadOutcome::Live { data } | ReadOutcome::Cached { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// A locally cached read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedReadEntry {
    pub data: Value,
    pub cached_at: DateTime<Utc>,
}

/// Result of one sync pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Operations applied and drained from the queue.
    pub replayed: usize,
    /// Transient failures left queued for the next pass.
    pub failed: usize,
    /// Operations still inside their backoff window, not attempted.
    pub skipped: usize,
    /// Permanent failures moved to the dead-letter record.
    pub dead_lettered: usize,
}

/// Current sync state, for status displays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Last completed sync pass.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Number of pending operations in the queue.
    pub pending_count: usize,
    /// Whether a sync pass is currently in flight.
    pub in_progress: bool,
    /// Whether the backend is currently considered reachable.
    pub online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pending_operation_round_trips_without_retry_fields() {
        // Queues persisted before the backoff fields existed still load.
        let legacy = json!({
            "id": "18f-abc",
            "path": "users/u1/tasks/t1",
            "payload": {"completed": true},
            "kind": "update",
            "enqueued_at": "2025-06-01T12:00:00Z"
        });
        let op: PendingOperation = serde_json::from_value(legacy).unwrap();
        assert_eq!(op.attempts, 0);
        assert!(op.next_attempt_at.is_none());
    }

    #[test]
    fn write_outcome_flags() {
        let queued = WriteOutcome::Queued {
            operation_id: "op1".into(),
        };
        assert!(queued.success());
        assert!(queued.offline());

        let applied = WriteOutcome::Applied {
            operation_id: "op2".into(),
        };
        assert!(applied.success());
        assert!(!applied.offline());

        let failed = WriteOutcome::Failed {
            operation_id: "op3".into(),
            error: StoreError::Unreachable("down".into()),
        };
        assert!(!failed.success());
    }
}
