//! Remote data store contract.
//!
//! Models the hosted realtime database the application syncs against:
//! hierarchical string paths, whole-value and merge writes, append with
//! generated keys, optimistic-concurrency transactions on single values,
//! and a connection liveness signal. The concrete wire protocol lives
//! behind this trait and is out of scope for the core.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Result of a one-shot read.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Whether a value exists at the path.
    pub exists: bool,
    /// The value (JSON `null` when absent).
    pub data: Value,
}

impl Snapshot {
    pub fn missing() -> Self {
        Self {
            exists: false,
            data: Value::Null,
        }
    }

    pub fn of(data: Value) -> Self {
        Self { exists: true, data }
    }
}

/// Result of an optimistic read-modify-write transaction.
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    /// Whether the write committed without a conflicting concurrent writer.
    pub committed: bool,
    /// The value at the path after the transaction settled.
    pub final_value: Value,
}

/// Callback invoked with the current value whenever a subscribed path
/// (or a descendant) changes.
pub type ValueCallback = Box<dyn Fn(Snapshot) + Send + Sync>;

/// Callback invoked when backend reachability changes.
pub type ConnectivityCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Active subscription guard. Dropping it detaches the listener.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// A subscription that was never attached (useful for stubs).
    pub fn detached() -> Self {
        Self { detach: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// Pure function applied inside a transaction: current value in (None when
/// absent), proposed value out (None aborts the transaction). May run more
/// than once when the store retries after a conflict.
pub type TransactionFn = dyn Fn(Option<Value>) -> Option<Value> + Send + Sync;

/// The remote data store collaborator.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One-shot read of the value at `path`.
    async fn get(&self, path: &str) -> Result<Snapshot, StoreError>;

    /// Replace the whole value at `path`.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merge `partial`'s top-level fields into the value at `path`.
    async fn update(&self, path: &str, partial: Value) -> Result<(), StoreError>;

    /// Append `value` under `path` with a store-generated key; returns the key.
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError>;

    /// Delete the value at `path`.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Optimistic read-modify-write on the value at `path`.
    ///
    /// The store retries `update_fn` until no conflicting concurrent
    /// writer is detected or its retry budget runs out.
    async fn transaction(
        &self,
        path: &str,
        update_fn: &TransactionFn,
    ) -> Result<TransactionOutcome, StoreError>;

    /// Live value-change notifications for `path` and its descendants.
    fn subscribe(&self, path: &str, callback: ValueCallback) -> Subscription;

    /// Backend reachability heartbeat. The callback fires with the current
    /// state on attach and on every transition afterwards.
    fn subscribe_connectivity(&self, callback: ConnectivityCallback) -> Subscription;
}
