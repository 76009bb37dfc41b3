//! In-process remote store.
//!
//! Backs the test suites and the CLI sandbox with the full [`RemoteStore`]
//! contract over a JSON tree: versioned writes so transactions genuinely
//! detect conflicting writers, an online/offline switch, injectable write
//! failures, per-path permission denial, and optional latency so overlapping
//! async callers actually interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::remote::{
    ConnectivityCallback, RemoteStore, Snapshot, Subscription, TransactionFn, TransactionOutcome,
    ValueCallback,
};

/// Give up after this many conflicting rewrites, mirroring hosted stores'
/// bounded transaction retry budget.
const MAX_TRANSACTION_RETRIES: u32 = 25;

type SharedValueCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;
type SharedConnectivityCallback = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    root: Value,
    /// Bumped on every committed write; transactions CAS against it.
    version: u64,
    online: bool,
    /// Writes to fail with `Unreachable` before succeeding again.
    write_failures: u32,
    /// Path prefixes rejected with `PermissionDenied`.
    denied_prefixes: Vec<String>,
    /// Applied writes in commit order, for replay-order assertions.
    write_log: Vec<(String, Value)>,
    push_counter: u64,
    value_subs: HashMap<u64, (String, SharedValueCallback)>,
    conn_subs: HashMap<u64, SharedConnectivityCallback>,
    next_sub_id: u64,
}

/// In-memory [`RemoteStore`] implementation.
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    latency_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                root: Value::Object(Map::new()),
                version: 0,
                online: true,
                write_failures: 0,
                denied_prefixes: Vec::new(),
                write_log: Vec::new(),
                push_counter: 0,
                value_subs: HashMap::new(),
                conn_subs: HashMap::new(),
                next_sub_id: 0,
            })),
            latency_ms: AtomicU64::new(0),
        }
    }

    // ── Test / sandbox controls ──────────────────────────────────────

    /// Flip backend reachability and notify liveness subscribers.
    pub fn set_online(&self, online: bool) {
        let callbacks: Vec<SharedConnectivityCallback> = {
            let mut inner = self.inner.lock().unwrap();
            if inner.online == online {
                return;
            }
            inner.online = online;
            inner.conn_subs.values().cloned().collect()
        };
        for cb in callbacks {
            cb(online);
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock().unwrap().online
    }

    /// Reject writes under `prefix` with `PermissionDenied`.
    pub fn deny_path(&self, prefix: &str) {
        self.inner
            .lock()
            .unwrap()
            .denied_prefixes
            .push(prefix.to_string());
    }

    /// Fail the next `n` writes with a transient `Unreachable` error.
    pub fn inject_write_failures(&self, n: u32) {
        self.inner.lock().unwrap().write_failures = n;
    }

    /// Add a per-operation delay so concurrent callers interleave.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Applied writes in commit order (set/update/push/remove).
    pub fn write_log(&self) -> Vec<(String, Value)> {
        self.inner.lock().unwrap().write_log.clone()
    }

    /// Clone of the whole tree (sandbox persistence).
    pub fn export(&self) -> Value {
        self.inner.lock().unwrap().root.clone()
    }

    /// Replace the whole tree (sandbox persistence).
    pub fn import(&self, root: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.root = root;
        inner.version += 1;
    }

    /// Direct read without the online check, for assertions.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let segs = segments(path).ok()?;
        let inner = self.inner.lock().unwrap();
        node_at(&inner.root, &segs).cloned()
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn begin_write(inner: &mut Inner, path: &str) -> Result<(), StoreError> {
        if !inner.online {
            return Err(StoreError::Unreachable("backend offline".into()));
        }
        if inner.write_failures > 0 {
            inner.write_failures -= 1;
            return Err(StoreError::Unreachable("injected write failure".into()));
        }
        if inner
            .denied_prefixes
            .iter()
            .any(|prefix| path == prefix || path.starts_with(&format!("{prefix}/")))
        {
            return Err(StoreError::PermissionDenied { path: path.into() });
        }
        Ok(())
    }

    /// Subscribers watching `path`, an ancestor of it, or a descendant,
    /// paired with the snapshot at their own subscription path.
    fn affected_subscribers(inner: &Inner, path: &str) -> Vec<(SharedValueCallback, Snapshot)> {
        inner
            .value_subs
            .values()
            .filter(|(sub_path, _)| overlapping(sub_path, path))
            .map(|(sub_path, cb)| {
                let snapshot = segments(sub_path)
                    .ok()
                    .and_then(|segs| node_at(&inner.root, &segs).cloned())
                    .map(Snapshot::of)
                    .unwrap_or_else(Snapshot::missing);
                (Arc::clone(cb), snapshot)
            })
            .collect()
    }

    fn commit(
        &self,
        path: &str,
        value: Value,
        apply: impl FnOnce(&mut Inner, &[&str], &Value),
    ) -> Result<(), StoreError> {
        let segs = segments(path)?;
        let notify = {
            let mut inner = self.inner.lock().unwrap();
            Self::begin_write(&mut inner, path)?;
            apply(&mut inner, &segs, &value);
            inner.version += 1;
            inner.write_log.push((path.to_string(), value));
            Self::affected_subscribers(&inner, path)
        };
        for (cb, snapshot) in notify {
            cb(snapshot);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Snapshot, StoreError> {
        self.simulate_latency().await;
        let segs = segments(path)?;
        let inner = self.inner.lock().unwrap();
        if !inner.online {
            return Err(StoreError::Unreachable("backend offline".into()));
        }
        Ok(node_at(&inner.root, &segs)
            .cloned()
            .map(Snapshot::of)
            .unwrap_or_else(Snapshot::missing))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.commit(path, value, |inner, segs, value| {
            *node_at_mut(&mut inner.root, segs) = value.clone();
        })
    }

    async fn update(&self, path: &str, partial: Value) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.commit(path, partial, |inner, segs, partial| {
            let node = node_at_mut(&mut inner.root, segs);
            match (node.as_object_mut(), partial.as_object()) {
                (Some(existing), Some(fields)) => {
                    for (key, value) in fields {
                        existing.insert(key.clone(), value.clone());
                    }
                }
                // Merging into a non-object (or with a non-object) degenerates
                // to replacement, matching hosted-store behavior.
                _ => *node = partial.clone(),
            }
        })
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        self.simulate_latency().await;
        let key = {
            let mut inner = self.inner.lock().unwrap();
            inner.push_counter += 1;
            // Zero-padded so generated keys sort in creation order.
            format!("k{:012}", inner.push_counter)
        };
        let child = format!("{path}/{key}");
        self.commit(&child, value, |inner, segs, value| {
            *node_at_mut(&mut inner.root, segs) = value.clone();
        })?;
        Ok(key)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.commit(path, Value::Null, |inner, segs, _| {
            remove_at(&mut inner.root, segs);
        })
    }

    async fn transaction(
        &self,
        path: &str,
        update_fn: &TransactionFn,
    ) -> Result<TransactionOutcome, StoreError> {
        let segs = segments(path)?;
        let mut attempts = 0;
        loop {
            let (current, seen_version) = {
                let inner = self.inner.lock().unwrap();
                if !inner.online {
                    return Err(StoreError::Unreachable("backend offline".into()));
                }
                (node_at(&inner.root, &segs).cloned(), inner.version)
            };

            let proposed = update_fn(current.clone());

            // Round trip to the backend: another writer may slip in here.
            self.simulate_latency().await;
            tokio::task::yield_now().await;

            let mut inner = self.inner.lock().unwrap();
            if inner.version != seen_version {
                attempts += 1;
                if attempts >= MAX_TRANSACTION_RETRIES {
                    return Err(StoreError::Conflict { path: path.into() });
                }
                continue;
            }
            return match proposed {
                None => Ok(TransactionOutcome {
                    committed: false,
                    final_value: current.unwrap_or(Value::Null),
                }),
                Some(value) => {
                    Self::begin_write(&mut inner, path)?;
                    *node_at_mut(&mut inner.root, &segs) = value.clone();
                    inner.version += 1;
                    let notify = Self::affected_subscribers(&inner, path);
                    drop(inner);
                    for (cb, snapshot) in notify {
                        cb(snapshot);
                    }
                    Ok(TransactionOutcome {
                        committed: true,
                        final_value: value,
                    })
                }
            };
        }
    }

    fn subscribe(&self, path: &str, callback: ValueCallback) -> Subscription {
        let callback: SharedValueCallback = Arc::from(callback);
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_sub_id;
            inner.next_sub_id += 1;
            inner
                .value_subs
                .insert(id, (path.to_string(), Arc::clone(&callback)));
            id
        };
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner.lock().unwrap().value_subs.remove(&id);
        })
    }

    fn subscribe_connectivity(&self, callback: ConnectivityCallback) -> Subscription {
        let callback: SharedConnectivityCallback = Arc::from(callback);
        let (id, online) = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_sub_id;
            inner.next_sub_id += 1;
            inner.conn_subs.insert(id, Arc::clone(&callback));
            (id, inner.online)
        };
        // Current state delivered on attach.
        callback(online);
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner.lock().unwrap().conn_subs.remove(&id);
        })
    }
}

// ── Path navigation ──────────────────────────────────────────────────

fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath(path.into()));
    }
    let segs: Vec<&str> = path.split('/').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.into()));
    }
    Ok(segs)
}

fn overlapping(a: &str, b: &str) -> bool {
    a == b || a.starts_with(&format!("{b}/")) || b.starts_with(&format!("{a}/"))
}

fn node_at<'a>(root: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segs {
        node = node.as_object()?.get(*seg)?;
    }
    Some(node)
}

/// Descend to the node at `segs`, materializing intermediate objects.
fn node_at_mut<'a>(root: &'a mut Value, segs: &[&str]) -> &'a mut Value {
    let mut node = root;
    for seg in segs {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .expect("just materialized an object")
            .entry(seg.to_string())
            .or_insert(Value::Null);
    }
    node
}

fn remove_at(root: &mut Value, segs: &[&str]) {
    let (leaf, parents) = match segs.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut node = root;
    for seg in parents {
        node = match node.as_object_mut().and_then(|map| map.get_mut(*seg)) {
            Some(child) => child,
            None => return,
        };
    }
    if let Some(map) = node.as_object_mut() {
        map.remove(*leaf);
    }
}
