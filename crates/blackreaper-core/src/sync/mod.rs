//! Offline-tolerant synchronization layer.
//!
//! Guarantees that writes requested while offline are not lost, are
//! eventually applied in submission order, and that reads degrade
//! gracefully to cached values when the backend is unreachable.

pub mod backoff;
pub mod queue;
pub mod types;

pub use backoff::RetryPolicy;
pub use queue::OfflineSyncQueue;
pub use types::{
    CachedReadEntry, DeadLetter, OpKind, PendingOperation, ReadOutcome, SyncReport, SyncStatus,
    WriteOutcome,
};
