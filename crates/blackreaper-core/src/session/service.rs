//! Session coordinator.
//!
//! Wires the countdown engine to the offline queue, the reward ledger,
//! and the stats counters: session lifecycle writes go through the
//! offline-tolerant path, completion of a work session awards RC cells
//! exactly once.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{error, warn};

use crate::events::{Event, EventBus};
use crate::ledger::{RewardKind, RewardLedger};
use crate::stats::StatsRecorder;
use crate::store::paths;
use crate::sync::OfflineSyncQueue;

use super::engine::{EngineSnapshot, EngineState, SessionEngine};
use super::types::{SessionKind, SessionRecord, SessionStatus};

/// Countdown progress is mirrored to the store at most this often.
const PROGRESS_WRITE_SECS: i64 = 15;

/// Drives session lifecycle against the engine and the backing services.
pub struct SessionService {
    user_id: String,
    engine: Mutex<SessionEngine>,
    queue: Arc<OfflineSyncQueue>,
    ledger: Arc<RewardLedger>,
    stats: Arc<StatsRecorder>,
    bus: EventBus,
    /// RC cells per planned work minute.
    reward_per_minute: i64,
    last_progress_write: Mutex<Option<DateTime<Utc>>>,
}

impl SessionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: impl Into<String>,
        engine: SessionEngine,
        queue: Arc<OfflineSyncQueue>,
        ledger: Arc<RewardLedger>,
        stats: Arc<StatsRecorder>,
        bus: EventBus,
        reward_per_minute: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            engine: Mutex::new(engine),
            queue,
            ledger,
            stats,
            bus,
            reward_per_minute,
            last_progress_write: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.engine.lock().unwrap().snapshot()
    }

    pub fn set_durations(&self, work_secs: u64, break_secs: u64) {
        self.engine.lock().unwrap().set_durations(work_secs, break_secs);
    }

    /// Serialized engine state, for persistence between processes.
    pub fn export_engine(&self) -> String {
        serde_json::to_string(&*self.engine.lock().unwrap()).unwrap_or_default()
    }

    /// Restore engine state persisted by [`export_engine`](Self::export_engine).
    pub fn import_engine(&self, raw: &str) -> Result<(), serde_json::Error> {
        let engine: SessionEngine = serde_json::from_str(raw)?;
        *self.engine.lock().unwrap() = engine;
        Ok(())
    }

    /// Start a session, creating its record in the store.
    pub async fn start(&self) -> Option<Event> {
        let (event, session) = {
            let mut engine = self.engine.lock().unwrap();
            let event = engine.start()?;
            (event, engine.active().cloned())
        };
        if let Some(session) = session {
            *self.last_progress_write.lock().unwrap() = Some(session.started_at);
            let record = SessionRecord {
                kind: session.kind,
                status: SessionStatus::Active,
                started_at: session.started_at,
                duration_secs: session.planned_secs,
            };
            match serde_json::to_value(&record) {
                Ok(payload) => {
                    self.queue
                        .set_with_offline_support(
                            &paths::session(&self.user_id, &session.id),
                            payload,
                        )
                        .await;
                }
                Err(e) => warn!(error = %e, "failed to serialize session record"),
            }
        }
        self.bus.publish(event.clone());
        Some(event)
    }

    pub async fn pause(&self) -> Option<Event> {
        let event = { self.engine.lock().unwrap().pause() }?;
        if let Event::SessionPaused {
            session_id,
            remaining_ms,
            at,
        } = &event
        {
            self.queue
                .update_with_offline_support(
                    &paths::session(&self.user_id, session_id),
                    json!({
                        "status": SessionStatus::Paused,
                        "remaining_secs": remaining_ms / 1000,
                        "paused_at": at,
                    }),
                )
                .await;
        }
        self.bus.publish(event.clone());
        Some(event)
    }

    pub async fn resume(&self) -> Option<Event> {
        let event = { self.engine.lock().unwrap().resume() }?;
        if let Event::SessionResumed { session_id, at, .. } = &event {
            self.queue
                .update_with_offline_support(
                    &paths::session(&self.user_id, session_id),
                    json!({
                        "status": SessionStatus::Active,
                        "resumed_at": at,
                    }),
                )
                .await;
        }
        self.bus.publish(event.clone());
        Some(event)
    }

    /// Abandon the session. No reward is issued.
    pub async fn cancel(&self) -> Option<Event> {
        let event = { self.engine.lock().unwrap().cancel() }?;
        if let Event::SessionCancelled { session_id, at } = &event {
            self.queue
                .update_with_offline_support(
                    &paths::session(&self.user_id, session_id),
                    json!({
                        "status": SessionStatus::Cancelled,
                        "ended_at": at,
                    }),
                )
                .await;
        }
        self.bus.publish(event.clone());
        Some(event)
    }

    /// Call periodically while a session runs. Completes the session when
    /// the countdown reaches zero.
    pub async fn tick(&self) -> Option<Event> {
        let elapsed = { self.engine.lock().unwrap().tick() };
        if elapsed {
            return self.complete(false).await;
        }
        self.write_progress().await;
        None
    }

    /// Manual "end session": completes (and rewards) even before the
    /// countdown elapses.
    pub async fn end_session(&self) -> Option<Event> {
        self.complete(true).await
    }

    async fn complete(&self, manual: bool) -> Option<Event> {
        // Claim before the first await: the losing half of a countdown-
        // vs-manual race observes Finalizing here and returns None.
        let ticket = { self.engine.lock().unwrap().begin_finalize(manual) }?;
        let session = ticket.session;
        let ended_at = Utc::now();

        self.queue
            .update_with_offline_support(
                &paths::session(&self.user_id, &session.id),
                json!({
                    "status": SessionStatus::Completed,
                    "ended_at": ended_at,
                    "remaining_secs": 0,
                }),
            )
            .await;

        if session.kind == SessionKind::Work {
            if let Err(err) = self.stats.record_pomodoro_completion(&self.user_id).await {
                warn!(error = %err, "failed to record pomodoro completion");
            }
            let amount = (session.planned_secs / 60) as i64 * self.reward_per_minute;
            if let Err(err) = self
                .ledger
                .award(
                    &self.user_id,
                    amount,
                    RewardKind::PomodoroCompletion,
                    Some(&session.id),
                )
                .await
            {
                // A reward failure must not take the timer down with it.
                error!(error = %err, session_id = %session.id, "reward award failed");
            }
        }

        self.engine.lock().unwrap().finish_finalize();
        let event = Event::SessionCompleted {
            session_id: session.id,
            kind: session.kind,
            manual: ticket.manual,
            at: ended_at,
        };
        self.bus.publish(event.clone());
        Some(event)
    }

    async fn write_progress(&self) {
        let (session_id, remaining_ms) = {
            let engine = self.engine.lock().unwrap();
            if engine.state() != EngineState::Running {
                return;
            }
            match engine.active() {
                Some(session) => (session.id.clone(), engine.remaining_ms()),
                None => return,
            }
        };
        let now = Utc::now();
        {
            let mut last = self.last_progress_write.lock().unwrap();
            if let Some(prev) = *last {
                if now - prev < Duration::seconds(PROGRESS_WRITE_SECS) {
                    return;
                }
            }
            *last = Some(now);
        }
        self.queue
            .update_with_offline_support(
                &paths::session(&self.user_id, &session_id),
                json!({
                    "remaining_secs": remaining_ms / 1000,
                    "last_updated": now,
                }),
            )
            .await;
    }

    #[cfg(test)]
    pub(crate) fn advance_countdown(&self, ms: u64) {
        self.engine.lock().unwrap().advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::store::{MemoryLocalStore, MemoryStore};
    use crate::sync::RetryPolicy;

    struct Fixture {
        remote: Arc<MemoryStore>,
        ledger: Arc<RewardLedger>,
        stats: Arc<StatsRecorder>,
        service: SessionService,
    }

    fn fixture() -> Fixture {
        let remote = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let bus = EventBus::new();
        let queue = OfflineSyncQueue::new(
            Arc::clone(&remote) as Arc<dyn crate::store::RemoteStore>,
            local,
            bus.clone(),
            Arc::new(RecordingNotifier::new()),
            RetryPolicy::default(),
            Duration::minutes(5),
        );
        let ledger = Arc::new(RewardLedger::new(
            Arc::clone(&remote) as Arc<dyn crate::store::RemoteStore>,
            bus.clone(),
        ));
        let stats = Arc::new(StatsRecorder::new(
            Arc::clone(&remote) as Arc<dyn crate::store::RemoteStore>,
        ));
        let service = SessionService::new(
            "u1",
            SessionEngine::new(25 * 60, 5 * 60),
            queue,
            Arc::clone(&ledger),
            Arc::clone(&stats),
            bus,
            1,
        );
        Fixture {
            remote,
            ledger,
            stats,
            service,
        }
    }

    fn session_id(fx: &Fixture) -> String {
        fx.service.snapshot().active.unwrap().id
    }

    #[tokio::test]
    async fn start_creates_active_record() {
        let fx = fixture();
        let event = fx.service.start().await.unwrap();
        let id = match event {
            Event::SessionStarted { session_id, .. } => session_id,
            other => panic!("unexpected event: {other:?}"),
        };

        let record = fx.remote.value_at(&paths::session("u1", &id)).unwrap();
        assert_eq!(record["status"], "active");
        assert_eq!(record["kind"], "work");
        assert_eq!(record["duration_secs"], 25 * 60);
    }

    #[tokio::test]
    async fn countdown_completion_awards_once_and_flips_kind() {
        let fx = fixture();
        fx.service.start().await.unwrap();
        let id = session_id(&fx);

        fx.service.advance_countdown(25 * 60 * 1000);
        let event = fx.service.tick().await.unwrap();
        assert!(matches!(
            event,
            Event::SessionCompleted {
                kind: SessionKind::Work,
                manual: false,
                ..
            }
        ));

        // Exactly one award of 25 RC (25 planned minutes x 1 per minute).
        let history = fx.ledger.history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 25);
        assert_eq!(history[0].source_id.as_deref(), Some(id.as_str()));
        assert_eq!(fx.ledger.balance("u1").await.unwrap(), 25);

        // Exactly one completion counted.
        assert_eq!(fx.stats.fetch("u1").await.unwrap().pomodoros_completed, 1);

        // Record closed, next session defaults to break.
        let record = fx.remote.value_at(&paths::session("u1", &id)).unwrap();
        assert_eq!(record["status"], "completed");
        assert_eq!(fx.service.snapshot().next_kind, SessionKind::Break);
    }

    #[tokio::test]
    async fn racing_completion_paths_award_once() {
        let fx = fixture();
        fx.service.start().await.unwrap();
        fx.service.advance_countdown(25 * 60 * 1000);

        // Countdown expiry and the manual end button firing together.
        let (from_tick, from_manual) =
            tokio::join!(fx.service.tick(), fx.service.end_session());
        assert_eq!(from_tick.is_some() as u8 + from_manual.is_some() as u8, 1);

        assert_eq!(fx.ledger.history("u1").await.unwrap().len(), 1);
        assert_eq!(fx.ledger.balance("u1").await.unwrap(), 25);
        assert_eq!(fx.stats.fetch("u1").await.unwrap().pomodoros_completed, 1);
    }

    #[tokio::test]
    async fn completing_twice_in_sequence_awards_once() {
        let fx = fixture();
        fx.service.start().await.unwrap();

        assert!(fx.service.end_session().await.is_some());
        // The session reference is gone; a second end finds nothing.
        assert!(fx.service.end_session().await.is_none());

        assert_eq!(fx.ledger.history("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn break_completion_is_not_rewarded() {
        let fx = fixture();
        // Complete a work session to flip to break.
        fx.service.start().await.unwrap();
        fx.service.end_session().await.unwrap();
        assert_eq!(fx.service.snapshot().next_kind, SessionKind::Break);

        fx.service.start().await.unwrap();
        fx.service.end_session().await.unwrap();

        // Only the work session paid out.
        assert_eq!(fx.ledger.history("u1").await.unwrap().len(), 1);
        assert_eq!(fx.stats.fetch("u1").await.unwrap().pomodoros_completed, 1);
        // And the kind flipped back to work.
        assert_eq!(fx.service.snapshot().next_kind, SessionKind::Work);
    }

    #[tokio::test]
    async fn cancelled_session_is_not_rewarded() {
        let fx = fixture();
        fx.service.start().await.unwrap();
        let id = session_id(&fx);

        fx.service.cancel().await.unwrap();

        let record = fx.remote.value_at(&paths::session("u1", &id)).unwrap();
        assert_eq!(record["status"], "cancelled");
        assert!(fx.ledger.history("u1").await.unwrap().is_empty());
        // A fresh start creates a new session of the same kind.
        assert_eq!(fx.service.snapshot().next_kind, SessionKind::Work);
    }

    #[tokio::test]
    async fn reward_failure_does_not_poison_the_state_machine() {
        let fx = fixture();
        fx.service.start().await.unwrap();

        // Backend vanishes mid-session: the award will fail, but the
        // engine must still settle into Idle with the kind flipped.
        fx.remote.set_online(false);
        let event = fx.service.end_session().await;
        assert!(event.is_some());
        assert_eq!(fx.service.snapshot().state, EngineState::Idle);
        assert_eq!(fx.service.snapshot().next_kind, SessionKind::Break);

        fx.remote.set_online(true);
        assert_eq!(fx.ledger.balance("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pause_and_resume_update_the_record() {
        let fx = fixture();
        fx.service.start().await.unwrap();
        let id = session_id(&fx);

        fx.service.pause().await.unwrap();
        let record = fx.remote.value_at(&paths::session("u1", &id)).unwrap();
        assert_eq!(record["status"], "paused");

        fx.service.resume().await.unwrap();
        let record = fx.remote.value_at(&paths::session("u1", &id)).unwrap();
        assert_eq!(record["status"], "active");
    }

    #[tokio::test]
    async fn engine_state_round_trips_through_export() {
        let fx = fixture();
        fx.service.start().await.unwrap();
        let exported = fx.service.export_engine();

        let fx2 = fixture();
        fx2.service.import_engine(&exported).unwrap();
        assert_eq!(fx2.service.snapshot().state, EngineState::Running);
        assert_eq!(
            fx2.service.snapshot().active.unwrap().id,
            fx.service.snapshot().active.unwrap().id
        );
    }
}
