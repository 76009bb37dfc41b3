//! Session record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a timed interval is work or recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Work,
    Break,
}

impl SessionKind {
    /// The kind that follows this one when a session completes.
    pub fn flip(self) -> Self {
        match self {
            SessionKind::Work => SessionKind::Break,
            SessionKind::Break => SessionKind::Work,
        }
    }
}

/// Lifecycle state stored on the session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

/// The session record created in the remote store when a countdown starts.
///
/// Later lifecycle changes are merge-updates against this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
}
