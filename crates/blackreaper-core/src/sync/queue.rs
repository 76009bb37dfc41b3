//! Durable offline write queue with cache-then-network reads.
//!
//! Writes requested while the backend is unreachable are appended to an
//! ordered queue, persisted synchronously to local storage, and replayed
//! in submission order once connectivity returns. Reads fall back to a
//! TTL-bounded local cache when live data cannot be fetched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::events::{Event, EventBus};
use crate::notify::{Notifier, ToastLevel};
use crate::store::{LocalStore, RemoteStore};
use crate::sync::backoff::RetryPolicy;
use crate::sync::types::{
    CachedReadEntry, DeadLetter, OpKind, PendingOperation, ReadOutcome, SyncReport, SyncStatus,
    WriteOutcome,
};

/// Durable storage key holding the whole-queue snapshot.
const QUEUE_KEY: &str = "blackreaper/pending_operations";
/// Durable storage key prefix for cached reads, namespaced by path.
const CACHE_PREFIX: &str = "blackreaper/cache/";
/// Durable storage key holding permanently-failed operations.
const DEAD_LETTER_KEY: &str = "blackreaper/dead_letter";

/// Toast only for batches big enough to be worth mentioning.
const SYNC_TOAST_THRESHOLD: usize = 3;

/// Both signals must agree before we consider the backend reachable:
/// a device can be on a network that cannot reach the backend.
#[derive(Debug, Clone, Copy)]
struct ConnectivityState {
    transport_online: bool,
    backend_connected: bool,
}

impl ConnectivityState {
    fn is_online(&self) -> bool {
        self.transport_online && self.backend_connected
    }
}

/// Offline-tolerant write queue and read cache over the remote store.
pub struct OfflineSyncQueue {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalStore>,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    cache_ttl: Duration,
    queue: Mutex<Vec<PendingOperation>>,
    connectivity: Mutex<ConnectivityState>,
    /// Re-entrancy guard: only one replay pass runs at a time.
    syncing: AtomicBool,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
    /// Self-handle for the background sync attempts the queue spawns.
    me: Weak<OfflineSyncQueue>,
}

impl OfflineSyncQueue {
    /// Build the queue, restoring any pending operations persisted by a
    /// previous session.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalStore>,
        bus: EventBus,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
        cache_ttl: Duration,
    ) -> Arc<Self> {
        let queue = load_queue(local.as_ref());
        if !queue.is_empty() {
            info!(pending = queue.len(), "restored pending operations from local storage");
        }
        Arc::new_cyclic(|me| Self {
            remote,
            local,
            bus,
            notifier,
            retry,
            cache_ttl,
            queue: Mutex::new(queue),
            // Optimistic until the liveness signal says otherwise; a failed
            // immediate attempt still leaves the queued copy safe.
            connectivity: Mutex::new(ConnectivityState {
                transport_online: true,
                backend_connected: true,
            }),
            syncing: AtomicBool::new(false),
            last_sync_at: Mutex::new(None),
            me: me.clone(),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_online(&self) -> bool {
        self.connectivity.lock().unwrap().is_online()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Snapshot of the queue, for status displays and tests.
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        self.queue.lock().unwrap().clone()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            last_sync_at: *self.last_sync_at.lock().unwrap(),
            pending_count: self.pending_count(),
            in_progress: self.syncing.load(Ordering::SeqCst),
            online: self.is_online(),
        }
    }

    /// Operations that failed permanently and were moved aside.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        match self.local.get_item(DEAD_LETTER_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt dead-letter record, ignoring");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read dead-letter record");
                Vec::new()
            }
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Append an operation and durably persist the queue before returning.
    ///
    /// Never fails: persistence errors degrade to in-memory-only queueing.
    /// If currently online, kicks off an asynchronous sync attempt.
    pub fn enqueue(&self, path: &str, payload: Value, kind: OpKind) -> String {
        let id = self.append_operation(path, payload, kind);
        if self.is_online() {
            self.spawn_sync();
        }
        id
    }

    /// Merge-write that survives disconnection. Always enqueues first; if
    /// online, additionally attempts the write immediately.
    pub async fn update_with_offline_support(&self, path: &str, payload: Value) -> WriteOutcome {
        self.write_with_offline_support(path, payload, OpKind::Update)
            .await
    }

    /// Whole-value write that survives disconnection.
    pub async fn set_with_offline_support(&self, path: &str, payload: Value) -> WriteOutcome {
        self.write_with_offline_support(path, payload, OpKind::Set)
            .await
    }

    async fn write_with_offline_support(
        &self,
        path: &str,
        payload: Value,
        kind: OpKind,
    ) -> WriteOutcome {
        let operation_id = self.append_operation(path, payload.clone(), kind);

        if !self.is_online() {
            debug!(%path, %operation_id, "offline, write accepted for eventual delivery");
            return WriteOutcome::Queued { operation_id };
        }

        let attempt = match kind {
            OpKind::Set => self.remote.set(path, payload).await,
            OpKind::Update => self.remote.update(path, payload).await,
        };

        match attempt {
            Ok(()) => {
                self.remove_operation(&operation_id);
                WriteOutcome::Applied { operation_id }
            }
            Err(error) => {
                // The queued copy stays; the next sync pass retries it.
                warn!(%path, %operation_id, %error, "immediate write failed, operation stays queued");
                WriteOutcome::Failed {
                    operation_id,
                    error,
                }
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Cache-then-network read.
    ///
    /// A cache entry younger than the TTL is authoritative enough to skip
    /// the network; a stale one is only served when the backend is
    /// unreachable.
    pub async fn get_with_offline_support(&self, path: &str) -> ReadOutcome {
        let online = self.is_online();

        if let Some(entry) = self.read_cache(path) {
            let fresh = Utc::now() - entry.cached_at < self.cache_ttl;
            if fresh || !online {
                return ReadOutcome::Cached {
                    data: entry.data,
                    cached_at: entry.cached_at,
                    offline: !online,
                };
            }
        }

        if !online {
            return ReadOutcome::Unavailable {
                error: StoreError::Unreachable("offline and no cached data available".into()),
            };
        }

        match self.remote.get(path).await {
            Ok(snapshot) if snapshot.exists => {
                self.write_cache(path, &snapshot.data);
                ReadOutcome::Live {
                    data: snapshot.data,
                }
            }
            Ok(_) => ReadOutcome::Missing,
            Err(error) => {
                warn!(%path, %error, "live read failed");
                ReadOutcome::Unavailable { error }
            }
        }
    }

    /// Drop all cached reads. Returns the number of entries removed.
    pub fn clear_cache(&self) -> usize {
        let keys = match self.local.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to enumerate cache keys");
                return 0;
            }
        };
        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
            match self.local.remove_item(key) {
                Ok(()) => removed += 1,
                Err(e) => warn!(%key, error = %e, "failed to remove cache entry"),
            }
        }
        self.notifier
            .toast(ToastLevel::Info, &format!("Cleared {removed} cached items"));
        removed
    }

    // ── Sync ─────────────────────────────────────────────────────────

    /// Replay queued operations in submission order.
    ///
    /// Re-entrant-safe: a call while a pass is already in flight is a
    /// no-op and returns `None`, as does a call while offline. Each
    /// operation's outcome is tracked independently; the pass never
    /// aborts early on a single failure.
    pub async fn sync_data(&self) -> Option<SyncReport> {
        if !self.is_online() {
            return None;
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync already in progress, skipping");
            return None;
        }

        let report = self.run_sync_pass().await;
        *self.last_sync_at.lock().unwrap() = Some(Utc::now());
        self.syncing.store(false, Ordering::SeqCst);
        Some(report)
    }

    /// Explicit sync trigger for "sync now" affordances.
    pub async fn force_sync(&self) -> Option<SyncReport> {
        self.sync_data().await
    }

    async fn run_sync_pass(&self) -> SyncReport {
        let mut operations = self.queue.lock().unwrap().clone();
        if operations.is_empty() {
            return SyncReport::default();
        }
        // Oldest first; the stable sort keeps submission order on ties.
        operations.sort_by_key(|op| op.enqueued_at);

        let now = Utc::now();
        let mut report = SyncReport::default();
        let mut replayed_ids = Vec::new();
        let mut dead: Vec<(PendingOperation, StoreError)> = Vec::new();
        let mut failed_attempts: Vec<(String, u32)> = Vec::new();

        for op in operations {
            if let Some(next) = op.next_attempt_at {
                if next > now {
                    report.skipped += 1;
                    continue;
                }
            }

            let attempt = match op.kind {
                OpKind::Set => self.remote.set(&op.path, op.payload.clone()).await,
                OpKind::Update => self.remote.update(&op.path, op.payload.clone()).await,
            };

            match attempt {
                Ok(()) => {
                    debug!(id = %op.id, path = %op.path, "operation replayed");
                    replayed_ids.push(op.id);
                    report.replayed += 1;
                }
                Err(error) if error.is_transient() => {
                    warn!(id = %op.id, path = %op.path, %error, "replay failed, will retry");
                    failed_attempts.push((op.id.clone(), op.attempts + 1));
                    report.failed += 1;
                }
                Err(error) => {
                    error!(id = %op.id, path = %op.path, %error, "replay failed permanently, dead-lettering");
                    dead.push((op, error));
                    report.dead_lettered += 1;
                }
            }
        }

        {
            let mut queue = self.queue.lock().unwrap();
            queue.retain(|op| {
                !replayed_ids.contains(&op.id) && !dead.iter().any(|(d, _)| d.id == op.id)
            });
            for op in queue.iter_mut() {
                if let Some((_, attempts)) =
                    failed_attempts.iter().find(|(id, _)| *id == op.id)
                {
                    op.attempts = *attempts;
                    op.next_attempt_at = Some(Utc::now() + self.retry.delay_after(*attempts));
                }
            }
            self.persist_queue(&queue);
        }

        if !dead.is_empty() {
            self.record_dead_letters(&dead);
        }

        if report.replayed > 0 {
            info!(replayed = report.replayed, "sync pass applied queued operations");
            if report.replayed > SYNC_TOAST_THRESHOLD {
                self.notifier.toast(
                    ToastLevel::Success,
                    &format!("Synced {} changes", report.replayed),
                );
            }
        }
        if report.failed > 0 {
            warn!(failed = report.failed, "sync pass left operations queued for retry");
        }

        self.bus.publish(Event::SyncCompleted {
            replayed: report.replayed,
            failed: report.failed,
            dead_lettered: report.dead_lettered,
            at: Utc::now(),
        });

        report
    }

    /// Run a sync pass periodically, as a fallback for missed connectivity
    /// transitions. The loop ends when the queue is dropped or the handle
    /// is aborted.
    pub fn spawn_periodic(&self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let me = self.me.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so the interval is
            // a fallback, not a startup sync.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(queue) = me.upgrade() else { break };
                queue.sync_data().await;
            }
        })
    }

    // ── Connectivity ─────────────────────────────────────────────────

    /// Transport-level "online" signal (device network came up).
    pub fn handle_transport_online(&self) {
        self.apply_connectivity(|state| state.transport_online = true);
    }

    /// Transport-level "offline" signal (device network went away).
    pub fn handle_transport_offline(&self) {
        self.apply_connectivity(|state| state.transport_online = false);
    }

    /// Backend liveness heartbeat. This is the authoritative signal:
    /// a reachable network with an unreachable backend is still offline.
    pub fn handle_liveness(&self, connected: bool) {
        self.apply_connectivity(|state| state.backend_connected = connected);
    }

    fn apply_connectivity(&self, mutate: impl FnOnce(&mut ConnectivityState)) {
        let (was_online, now_online) = {
            let mut state = self.connectivity.lock().unwrap();
            let was = state.is_online();
            mutate(&mut state);
            (was, state.is_online())
        };
        if was_online == now_online {
            return;
        }
        if now_online {
            info!("connection restored");
            self.notifier.toast(ToastLevel::Success, "Connection restored");
            self.bus.publish(Event::ConnectivityRestored { at: Utc::now() });
            self.spawn_sync();
        } else {
            info!("connection lost, working offline");
            self.notifier
                .toast(ToastLevel::Warning, "Connection lost - working offline");
            self.bus.publish(Event::ConnectivityLost { at: Utc::now() });
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn append_operation(&self, path: &str, payload: Value, kind: OpKind) -> String {
        let now = Utc::now();
        let id = format!("{:x}-{}", now.timestamp_millis(), Uuid::new_v4().simple());
        let operation = PendingOperation {
            id: id.clone(),
            path: path.to_string(),
            payload,
            kind,
            enqueued_at: now,
            attempts: 0,
            next_attempt_at: None,
        };
        let mut queue = self.queue.lock().unwrap();
        queue.push(operation);
        self.persist_queue(&queue);
        id
    }

    fn remove_operation(&self, operation_id: &str) {
        let mut queue = self.queue.lock().unwrap();
        queue.retain(|op| op.id != operation_id);
        self.persist_queue(&queue);
    }

    /// Persist the whole queue snapshot. Failures leave the in-memory
    /// queue authoritative for this session.
    fn persist_queue(&self, queue: &[PendingOperation]) {
        let serialized = match serde_json::to_string(queue) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to serialize pending operations");
                return;
            }
        };
        if let Err(e) = self.local.set_item(QUEUE_KEY, &serialized) {
            error!(error = %e, "failed to persist pending operations, queue is in-memory only");
        }
    }

    fn record_dead_letters(&self, dead: &[(PendingOperation, StoreError)]) {
        let mut letters = self.dead_letters();
        for (op, error) in dead {
            self.bus.publish(Event::OperationDeadLettered {
                operation_id: op.id.clone(),
                path: op.path.clone(),
                at: Utc::now(),
            });
            letters.push(DeadLetter {
                operation: op.clone(),
                reason: error.to_string(),
                at: Utc::now(),
            });
        }
        match serde_json::to_string(&letters) {
            Ok(serialized) => {
                if let Err(e) = self.local.set_item(DEAD_LETTER_KEY, &serialized) {
                    warn!(error = %e, "failed to persist dead-letter record");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize dead-letter record"),
        }
    }

    fn spawn_sync(&self) {
        let Some(queue) = self.me.upgrade() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, sync deferred to next pass");
            return;
        };
        handle.spawn(async move {
            queue.sync_data().await;
        });
    }

    fn read_cache(&self, path: &str) -> Option<CachedReadEntry> {
        let raw = match self.local.get_item(&cache_key(path)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(%path, error = %e, "failed to read cache entry");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(%path, error = %e, "corrupt cache entry, ignoring");
                None
            }
        }
    }

    fn write_cache(&self, path: &str, data: &Value) {
        let entry = CachedReadEntry {
            data: data.clone(),
            cached_at: Utc::now(),
        };
        match serde_json::to_string(&entry) {
            Ok(serialized) => {
                if let Err(e) = self.local.set_item(&cache_key(path), &serialized) {
                    warn!(%path, error = %e, "failed to cache read");
                }
            }
            Err(e) => warn!(%path, error = %e, "failed to serialize cache entry"),
        }
    }
}

fn cache_key(path: &str) -> String {
    format!("{CACHE_PREFIX}{path}")
}

fn load_queue(local: &dyn LocalStore) -> Vec<PendingOperation> {
    match local.get_item(QUEUE_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            error!(error = %e, "corrupt pending-operation snapshot, starting empty");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            error!(error = %e, "failed to load pending operations, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::store::{MemoryLocalStore, MemoryStore};
    use serde_json::json;

    fn queue_with(
        remote: Arc<MemoryStore>,
        local: Arc<MemoryLocalStore>,
    ) -> Arc<OfflineSyncQueue> {
        OfflineSyncQueue::new(
            remote,
            local,
            EventBus::new(),
            Arc::new(RecordingNotifier::new()),
            RetryPolicy::default(),
            Duration::minutes(5),
        )
    }

    #[tokio::test]
    async fn enqueue_persists_synchronously() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(remote, Arc::clone(&local));

        queue.enqueue("users/u1/tasks/t1", json!({"completed": true}), OpKind::Update);

        let raw = local.get_item(QUEUE_KEY).unwrap().unwrap();
        let persisted: Vec<PendingOperation> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].path, "users/u1/tasks/t1");
    }

    #[tokio::test]
    async fn enqueue_survives_storage_failure() {
        let remote = Arc::new(MemoryStore::new());
        remote.set_online(false);
        let local = Arc::new(MemoryLocalStore::new());
        local.set_fail_writes(true);
        let queue = queue_with(remote, local);

        // Still accepted into the in-memory queue.
        queue.enqueue("a/b", json!(1), OpKind::Set);
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn restores_queue_from_previous_session() {
        let remote = Arc::new(MemoryStore::new());
        remote.set_online(false);
        let local = Arc::new(MemoryLocalStore::new());

        let queue = queue_with(Arc::clone(&remote), Arc::clone(&local));
        queue.enqueue("a/b", json!({"v": 1}), OpKind::Set);
        queue.enqueue("a/c", json!({"v": 2}), OpKind::Set);
        drop(queue);

        let revived = queue_with(remote, local);
        assert_eq!(revived.pending_count(), 2);
    }

    #[tokio::test]
    async fn offline_write_reports_queued() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(Arc::clone(&remote), local);

        remote.set_online(false);
        queue.handle_liveness(false);

        let outcome = queue
            .update_with_offline_support("users/u1/tasks/t1", json!({"completed": true}))
            .await;
        assert!(outcome.success());
        assert!(outcome.offline());
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn online_write_applies_and_drains() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(Arc::clone(&remote), local);

        let outcome = queue
            .set_with_offline_support("users/u1/profile", json!({"mode": "ghoul"}))
            .await;
        assert!(outcome.success());
        assert!(!outcome.offline());
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(remote.value_at("users/u1/profile"), Some(json!({"mode": "ghoul"})));
    }

    #[tokio::test]
    async fn failed_immediate_write_stays_queued() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(Arc::clone(&remote), local);

        // Online as far as the queue knows, but the write itself fails.
        remote.inject_write_failures(1);
        let outcome = queue
            .update_with_offline_support("a/b", json!({"v": 1}))
            .await;
        assert!(!outcome.success());
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn stale_cache_is_fallback_only() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(Arc::clone(&remote), Arc::clone(&local));

        // Plant a cache entry well past the TTL.
        let stale = CachedReadEntry {
            data: json!({"level": 2}),
            cached_at: Utc::now() - Duration::minutes(30),
        };
        local
            .set_item(&cache_key("users/u1/profile"), &serde_json::to_string(&stale).unwrap())
            .unwrap();
        remote
            .set("users/u1/profile", json!({"level": 3}))
            .await
            .unwrap();

        // Online: the stale entry is bypassed for live data.
        let outcome = queue.get_with_offline_support("users/u1/profile").await;
        assert!(!outcome.cached());
        assert_eq!(outcome.data().unwrap()["level"], 3);

        // Offline: the (now refreshed) cache is served as fallback.
        remote.set_online(false);
        queue.handle_liveness(false);
        let outcome = queue.get_with_offline_support("users/u1/profile").await;
        assert!(outcome.cached());
        assert_eq!(outcome.data().unwrap()["level"], 3);
    }

    #[tokio::test]
    async fn offline_without_cache_fails_explicitly() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(Arc::clone(&remote), local);

        remote.set_online(false);
        queue.handle_liveness(false);

        let outcome = queue.get_with_offline_support("users/u1/profile").await;
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn clear_cache_removes_only_cache_entries() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(remote, Arc::clone(&local));

        local.set_item(&cache_key("a/b"), "{}").unwrap();
        local.set_item(&cache_key("a/c"), "{}").unwrap();
        local.set_item(QUEUE_KEY, "[]").unwrap();

        assert_eq!(queue.clear_cache(), 2);
        assert_eq!(local.get_item(QUEUE_KEY).unwrap(), Some("[]".to_string()));
    }

    #[tokio::test]
    async fn connectivity_transitions_produce_toasts() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = OfflineSyncQueue::new(
            remote,
            local,
            EventBus::new(),
            Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
            RetryPolicy::default(),
            Duration::minutes(5),
        );

        queue.handle_liveness(false);
        queue.handle_liveness(true);
        // Repeats without a transition stay silent.
        queue.handle_liveness(true);

        assert_eq!(
            notifier.messages(),
            vec![
                "Connection lost - working offline".to_string(),
                "Connection restored".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn liveness_overrides_transport() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let queue = queue_with(remote, local);

        // Device network is up, but the backend heartbeat says unreachable.
        queue.handle_transport_online();
        queue.handle_liveness(false);
        assert!(!queue.is_online());

        queue.handle_liveness(true);
        assert!(queue.is_online());
    }
}
