//! Session countdown state machine.
//!
//! The engine is wall-clock based and has no internal thread -- the
//! caller is responsible for calling `tick()` periodically.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> Finalizing -> Idle
//!                 \-> Idle (cancel)
//! ```
//!
//! `Finalizing` exists to close the double-completion race: the countdown
//! expiring and the user pressing "end session" can both reach the reward
//! path. Whichever caller claims the session with [`begin_finalize`]
//! first owns completion; the other observes `Finalizing` and backs off.
//! The claim is synchronous, so within one event loop no award can start
//! twice for the same session.
//!
//! [`begin_finalize`]: SessionEngine::begin_finalize

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::SessionKind;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Running,
    Paused,
    /// A completion path has claimed the session and is running the
    /// (async) award flow.
    Finalizing,
}

/// The session currently owned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    pub id: String,
    pub kind: SessionKind,
    /// Planned length, fixed at start.
    pub planned_secs: u64,
    pub started_at: DateTime<Utc>,
}

/// Claim handed to the one caller allowed to complete the session.
#[derive(Debug, Clone)]
pub struct FinalizeTicket {
    pub session: ActiveSession,
    /// Whether the user ended the session before the countdown elapsed.
    pub manual: bool,
}

/// Full engine state for status displays and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub next_kind: SessionKind,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub active: Option<ActiveSession>,
}

/// Wall-clock countdown state machine for work/break sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEngine {
    state: EngineState,
    /// Kind of the session `start()` will create.
    next_kind: SessionKind,
    work_secs: u64,
    break_secs: u64,
    /// Remaining time in milliseconds for the current countdown.
    remaining_ms: u64,
    /// Timestamp (ms since epoch) of the last tick while running.
    #[serde(default)]
    last_tick_epoch_ms: Option<u64>,
    #[serde(default)]
    active: Option<ActiveSession>,
}

impl SessionEngine {
    /// Create an idle engine. The first session is a work session.
    pub fn new(work_secs: u64, break_secs: u64) -> Self {
        Self {
            state: EngineState::Idle,
            next_kind: SessionKind::Work,
            work_secs,
            break_secs,
            remaining_ms: work_secs.saturating_mul(1000),
            last_tick_epoch_ms: None,
            active: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn next_kind(&self) -> SessionKind {
        self.next_kind
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn total_ms(&self) -> u64 {
        match &self.active {
            Some(session) => session.planned_secs.saturating_mul(1000),
            None => self.planned_secs(self.next_kind).saturating_mul(1000),
        }
    }

    /// 0.0 .. 1.0 progress within the current countdown.
    pub fn progress(&self) -> f64 {
        let total = self.total_ms();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_ms as f64 / total as f64)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state,
            next_kind: self.next_kind,
            remaining_ms: self.remaining_ms,
            total_ms: self.total_ms(),
            active: self.active.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session. Only valid from `Idle`.
    pub fn start(&mut self) -> Option<Event> {
        if self.state != EngineState::Idle {
            return None;
        }
        let session = ActiveSession {
            id: Uuid::new_v4().to_string(),
            kind: self.next_kind,
            planned_secs: self.remaining_ms / 1000,
            started_at: Utc::now(),
        };
        self.state = EngineState::Running;
        self.last_tick_epoch_ms = Some(now_ms());
        let event = Event::SessionStarted {
            session_id: session.id.clone(),
            kind: session.kind,
            duration_secs: session.planned_secs,
            at: session.started_at,
        };
        self.active = Some(session);
        Some(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state != EngineState::Running {
            return None;
        }
        self.flush_elapsed();
        self.state = EngineState::Paused;
        self.last_tick_epoch_ms = None;
        Some(Event::SessionPaused {
            session_id: self.active.as_ref()?.id.clone(),
            remaining_ms: self.remaining_ms,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.state != EngineState::Paused {
            return None;
        }
        self.state = EngineState::Running;
        self.last_tick_epoch_ms = Some(now_ms());
        Some(Event::SessionResumed {
            session_id: self.active.as_ref()?.id.clone(),
            remaining_ms: self.remaining_ms,
            at: Utc::now(),
        })
    }

    /// Abandon the session without completing it. The next session keeps
    /// the same kind -- cancellation never flips work/break.
    pub fn cancel(&mut self) -> Option<Event> {
        if !matches!(self.state, EngineState::Running | EngineState::Paused) {
            return None;
        }
        let session = self.active.take()?;
        self.state = EngineState::Idle;
        self.last_tick_epoch_ms = None;
        self.rearm();
        Some(Event::SessionCancelled {
            session_id: session.id,
            at: Utc::now(),
        })
    }

    /// Call periodically while running. Returns `true` when the countdown
    /// reached zero on this tick; the caller must then claim the session
    /// with [`begin_finalize`](Self::begin_finalize) and run completion.
    pub fn tick(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        self.flush_elapsed();
        self.remaining_ms == 0
    }

    /// Advance the countdown without waiting on the wall clock, for
    /// callers that manage their own time (simulations, tests).
    pub fn advance(&mut self, ms: u64) {
        if matches!(self.state, EngineState::Running | EngineState::Paused) {
            self.remaining_ms = self.remaining_ms.saturating_sub(ms);
        }
    }

    /// Claim the active session for completion. The first caller gets the
    /// ticket; any later caller (the other half of a countdown-vs-manual
    /// race) gets `None`.
    pub fn begin_finalize(&mut self, manual: bool) -> Option<FinalizeTicket> {
        if !matches!(self.state, EngineState::Running | EngineState::Paused) {
            return None;
        }
        let session = self.active.clone()?;
        self.state = EngineState::Finalizing;
        self.last_tick_epoch_ms = None;
        Some(FinalizeTicket { session, manual })
    }

    /// Conclude a claimed completion: clear the session, flip the next
    /// kind, and rearm the countdown.
    pub fn finish_finalize(&mut self) {
        if self.state != EngineState::Finalizing {
            return;
        }
        if let Some(session) = self.active.take() {
            self.next_kind = session.kind.flip();
        }
        self.state = EngineState::Idle;
        self.rearm();
    }

    /// Update durations. Takes effect immediately when idle, otherwise on
    /// the next rearm.
    pub fn set_durations(&mut self, work_secs: u64, break_secs: u64) {
        self.work_secs = work_secs;
        self.break_secs = break_secs;
        if self.state == EngineState::Idle {
            self.rearm();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn planned_secs(&self, kind: SessionKind) -> u64 {
        match kind {
            SessionKind::Work => self.work_secs,
            SessionKind::Break => self.break_secs,
        }
    }

    fn rearm(&mut self) {
        self.remaining_ms = self.planned_secs(self.next_kind).saturating_mul(1000);
    }

    fn flush_elapsed(&mut self) {
        if let Some(last) = self.last_tick_epoch_ms {
            let now = now_ms();
            let elapsed = now.saturating_sub(last);
            self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
            self.last_tick_epoch_ms = Some(now);
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
