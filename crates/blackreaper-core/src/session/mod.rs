//! Pomodoro session tracking.

mod engine;
mod service;
mod types;

pub use engine::{ActiveSession, EngineSnapshot, EngineState, FinalizeTicket, SessionEngine};
pub use service::SessionService;
pub use types::{SessionKind, SessionRecord, SessionStatus};
