//! Per-sign-in service graph.
//!
//! All services are explicitly constructed and dependency-injected here,
//! with their lifecycle owned by the signed-in session: built at sign-in,
//! detached at sign-out. Nothing in the core is an ambient global.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::LedgerError;
use crate::events::EventBus;
use crate::ledger::{RewardKind, RewardLedger};
use crate::notify::Notifier;
use crate::session::{SessionEngine, SessionService};
use crate::stats::StatsRecorder;
use crate::store::{paths, LocalStore, RemoteStore, Subscription};
use crate::sync::{OfflineSyncQueue, WriteOutcome};

/// The signed-in user's service graph.
pub struct SessionContext {
    user_id: String,
    bus: EventBus,
    queue: Arc<OfflineSyncQueue>,
    ledger: Arc<RewardLedger>,
    stats: Arc<StatsRecorder>,
    session: SessionService,
    rc_per_task: i64,
    _liveness: Subscription,
    periodic: tokio::task::JoinHandle<()>,
}

impl SessionContext {
    /// Build the service graph for a signed-in user.
    ///
    /// Restores any pending operations persisted by a previous session,
    /// attaches the backend liveness signal to the queue, starts the
    /// periodic fallback sync, and runs an initial replay pass.
    pub async fn sign_in(
        user_id: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalStore>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        let user_id = user_id.into();
        let bus = EventBus::new();

        let queue = OfflineSyncQueue::new(
            Arc::clone(&remote),
            local,
            bus.clone(),
            notifier,
            config.retry_policy(),
            config.cache_ttl(),
        );

        let liveness = remote.subscribe_connectivity(Box::new({
            let queue = Arc::clone(&queue);
            move |connected| queue.handle_liveness(connected)
        }));
        let periodic = queue.spawn_periodic(config.sync_interval());

        let ledger = Arc::new(RewardLedger::new(Arc::clone(&remote), bus.clone()));
        let stats = Arc::new(StatsRecorder::new(Arc::clone(&remote)));
        let session = SessionService::new(
            user_id.clone(),
            SessionEngine::new(config.work_secs(), config.break_secs()),
            Arc::clone(&queue),
            Arc::clone(&ledger),
            Arc::clone(&stats),
            bus.clone(),
            config.reward.rc_per_work_minute,
        );

        info!(%user_id, "session context created");
        queue.sync_data().await;

        Self {
            user_id,
            bus,
            queue,
            ledger,
            stats,
            session,
            rc_per_task: config.reward.rc_per_task,
            _liveness: liveness,
            periodic,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn queue(&self) -> &Arc<OfflineSyncQueue> {
        &self.queue
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn stats(&self) -> &StatsRecorder {
        &self.stats
    }

    pub fn session(&self) -> &SessionService {
        &self.session
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Mark a task completed, count it, and award its RC.
    ///
    /// The task write itself is offline-tolerant; the reward is not (the
    /// balance increment needs the store's transaction primitive), so a
    /// completion while offline marks the task but returns the ledger
    /// error for the caller to surface or retry.
    pub async fn complete_task(&self, task_id: &str) -> Result<WriteOutcome, LedgerError> {
        let outcome = self
            .queue
            .update_with_offline_support(
                &paths::task(&self.user_id, task_id),
                json!({"completed": true, "completed_at": Utc::now()}),
            )
            .await;
        if let Err(err) = self.stats.record_task_completion(&self.user_id).await {
            warn!(error = %err, "failed to record task completion");
        }
        self.ledger
            .award(
                &self.user_id,
                self.rc_per_task,
                RewardKind::TaskCompletion,
                Some(task_id),
            )
            .await?;
        Ok(outcome)
    }

    /// Tear the context down.
    ///
    /// Listeners detach and the periodic sync stops; the pending queue is
    /// left intact in durable storage for the next sign-in.
    pub fn sign_out(self) {
        info!(user_id = %self.user_id, "signing out, detaching sync listeners");
        // Drop does the work.
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.periodic.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::store::{MemoryLocalStore, MemoryStore};
    use crate::sync::OpKind;

    async fn context_with(
        remote: Arc<MemoryStore>,
        local: Arc<MemoryLocalStore>,
    ) -> SessionContext {
        SessionContext::sign_in(
            "u1",
            remote as Arc<dyn RemoteStore>,
            local,
            Arc::new(RecordingNotifier::new()),
            &Config::default(),
        )
        .await
    }

    #[tokio::test]
    async fn liveness_signal_drives_queue_connectivity() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let ctx = context_with(Arc::clone(&remote), local).await;

        assert!(ctx.queue().is_online());
        remote.set_online(false);
        assert!(!ctx.queue().is_online());
        remote.set_online(true);
        assert!(ctx.queue().is_online());
    }

    #[tokio::test]
    async fn sign_out_leaves_queue_persisted() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());

        let ctx = context_with(Arc::clone(&remote), Arc::clone(&local)).await;
        remote.set_online(false);
        ctx.queue()
            .enqueue("users/u1/journal/j1", json!({"mood": "grim"}), OpKind::Set);
        ctx.sign_out();

        let revived = context_with(remote, local).await;
        assert_eq!(revived.queue().pending_count(), 1);
    }

    #[tokio::test]
    async fn complete_task_marks_counts_and_awards() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let ctx = context_with(Arc::clone(&remote), local).await;

        let outcome = ctx.complete_task("t1").await.unwrap();
        assert!(outcome.success());

        let task = remote.value_at(&paths::task("u1", "t1")).unwrap();
        assert_eq!(task["completed"], true);
        assert_eq!(ctx.stats().fetch("u1").await.unwrap().tasks_completed, 1);

        let history = ctx.ledger().history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, RewardKind::TaskCompletion);
        assert_eq!(history[0].source_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn offline_task_completion_defers_write_but_fails_reward() {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let ctx = context_with(Arc::clone(&remote), local).await;

        remote.set_online(false);
        let err = ctx.complete_task("t2").await.unwrap_err();
        assert!(matches!(err, LedgerError::Store(e) if e.is_transient()));
        // The task write itself was accepted for eventual delivery.
        assert!(ctx.queue().has_pending());
    }
}
