//! RC-cell reward ledger.
//!
//! Awards currency for qualifying completions, keeps the running balance
//! consistent under concurrent writers, and appends an auditable
//! transaction trail.
//!
//! The balance is the only value in the system mutated by formula
//! (`current + delta`) rather than wholesale replacement, so it is the
//! only one that goes through the store's optimistic-concurrency
//! transaction primitive instead of the offline queue.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::LedgerError;
use crate::events::{Event, EventBus};
use crate::store::{paths, RemoteStore};

/// What earned (or cost) the RC cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    TaskCompletion,
    PomodoroCompletion,
    ManualAdjustment,
}

/// One entry in the append-only per-user transaction log.
///
/// Informational: the balance value in the store is the source of truth,
/// this record is the audit trail observed at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTransaction {
    /// Credits positive, debits negative.
    pub amount: i64,
    pub kind: RewardKind,
    pub timestamp: DateTime<Utc>,
    pub previous_balance: i64,
    pub new_balance: i64,
    /// Originating session/task, when the reward is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// Transactional accumulator for the RC-cell currency.
pub struct RewardLedger {
    remote: Arc<dyn RemoteStore>,
    bus: EventBus,
}

impl RewardLedger {
    pub fn new(remote: Arc<dyn RemoteStore>, bus: EventBus) -> Self {
        Self { remote, bus }
    }

    /// Atomically add `amount` to the user's balance and append the audit
    /// record.
    ///
    /// The balance increment is an optimistic read-modify-write retried by
    /// the store until no conflicting concurrent writer is detected. The
    /// audit append afterwards is best-effort: a failure there is logged
    /// but does not roll back the committed balance.
    pub async fn award(
        &self,
        user_id: &str,
        amount: i64,
        kind: RewardKind,
        source_id: Option<&str>,
    ) -> Result<RewardTransaction, LedgerError> {
        let balance_path = paths::rc_cells(user_id);

        let observed = Arc::new(AtomicI64::new(0));
        let observed_fn = Arc::clone(&observed);
        let outcome = self
            .remote
            .transaction(&balance_path, &move |current| {
                let balance = current.as_ref().and_then(Value::as_i64).unwrap_or(0);
                observed_fn.store(balance, Ordering::SeqCst);
                Some(json!(balance + amount))
            })
            .await?;

        if !outcome.committed {
            return Err(LedgerError::NotCommitted { path: balance_path });
        }

        let previous_balance = observed.load(Ordering::SeqCst);
        let new_balance = outcome
            .final_value
            .as_i64()
            .unwrap_or(previous_balance + amount);

        let record = RewardTransaction {
            amount,
            kind,
            timestamp: Utc::now(),
            previous_balance,
            new_balance,
            source_id: source_id.map(str::to_string),
        };

        if let Err(error) = self
            .remote
            .push(&paths::transactions(user_id), serde_json::to_value(&record)?)
            .await
        {
            warn!(%user_id, %error, "failed to append reward transaction to audit log");
        }

        self.bus.publish(Event::BalanceUpdated {
            user_id: user_id.to_string(),
            balance: new_balance,
            at: record.timestamp,
        });

        Ok(record)
    }

    /// Current balance, zero when the user has never been awarded.
    pub async fn balance(&self, user_id: &str) -> Result<i64, LedgerError> {
        let snapshot = self.remote.get(&paths::rc_cells(user_id)).await?;
        Ok(snapshot.data.as_i64().unwrap_or(0))
    }

    /// Transaction history, oldest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<RewardTransaction>, LedgerError> {
        let snapshot = self.remote.get(&paths::transactions(user_id)).await?;
        let mut records: Vec<RewardTransaction> = match snapshot.data.as_object() {
            Some(map) => map
                .values()
                .cloned()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}
