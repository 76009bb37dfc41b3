//! Completion counters.
//!
//! Counters are incremented by formula, so they go through the store's
//! transaction primitive rather than the offline queue: two devices
//! completing sessions concurrently must both count.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::store::{paths, RemoteStore};

/// Aggregate completion counters for a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub pomodoros_completed: u64,
    #[serde(default)]
    pub tasks_completed: u64,
}

/// Writes completion counters to the remote store.
pub struct StatsRecorder {
    remote: Arc<dyn RemoteStore>,
}

impl StatsRecorder {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Count one completed work session. Returns the new count.
    pub async fn record_pomodoro_completion(&self, user_id: &str) -> Result<u64, StoreError> {
        self.bump(user_id, "pomodoros_completed").await
    }

    /// Count one completed task. Returns the new count.
    pub async fn record_task_completion(&self, user_id: &str) -> Result<u64, StoreError> {
        self.bump(user_id, "tasks_completed").await
    }

    /// Current counters, zeroed when the user has none yet.
    pub async fn fetch(&self, user_id: &str) -> Result<Stats, StoreError> {
        let snapshot = self.remote.get(&paths::user_stats(user_id)).await?;
        if !snapshot.exists {
            return Ok(Stats::default());
        }
        serde_json::from_value(snapshot.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn bump(&self, user_id: &str, field: &str) -> Result<u64, StoreError> {
        let path = paths::user_stats(user_id);
        let field_key = field.to_string();
        let outcome = self
            .remote
            .transaction(&path, &move |current| {
                let mut stats = match current {
                    Some(value @ Value::Object(_)) => value,
                    _ => json!({}),
                };
                let count = stats[&field_key].as_u64().unwrap_or(0) + 1;
                stats[&field_key] = json!(count);
                Some(stats)
            })
            .await?;
        if !outcome.committed {
            return Err(StoreError::Conflict { path });
        }
        Ok(outcome.final_value[field].as_u64().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn counters_start_at_zero() {
        let recorder = StatsRecorder::new(Arc::new(MemoryStore::new()));
        let stats = recorder.fetch("u1").await.unwrap();
        assert_eq!(stats.pomodoros_completed, 0);
        assert_eq!(stats.tasks_completed, 0);
    }

    #[tokio::test]
    async fn bump_increments_single_counter() {
        let recorder = StatsRecorder::new(Arc::new(MemoryStore::new()));

        assert_eq!(recorder.record_pomodoro_completion("u1").await.unwrap(), 1);
        assert_eq!(recorder.record_pomodoro_completion("u1").await.unwrap(), 2);
        assert_eq!(recorder.record_task_completion("u1").await.unwrap(), 1);

        let stats = recorder.fetch("u1").await.unwrap();
        assert_eq!(stats.pomodoros_completed, 2);
        assert_eq!(stats.tasks_completed, 1);
    }

    #[tokio::test]
    async fn bump_preserves_other_fields() {
        let remote = Arc::new(MemoryStore::new());
        remote
            .set("users/u1/stats", json!({"battles_won": 4}))
            .await
            .unwrap();
        let recorder = StatsRecorder::new(Arc::clone(&remote) as Arc<dyn RemoteStore>);

        recorder.record_task_completion("u1").await.unwrap();

        let value = remote.value_at("users/u1/stats").unwrap();
        assert_eq!(value["battles_won"], 4);
        assert_eq!(value["tasks_completed"], 1);
    }
}
