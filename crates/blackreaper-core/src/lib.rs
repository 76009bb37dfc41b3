//! # BlackReaper Core Library
//!
//! Core business logic for BlackReaper, the human/ghoul-themed
//! productivity tracker. The library is UI-free: presentation layers
//! (desktop, web) sit on top of the same services the CLI binary uses.
//!
//! ## Architecture
//!
//! - **Offline sync queue**: durable, ordered queue of pending writes
//!   against the remote store, replayed in submission order when
//!   connectivity returns, with cache-then-network reads
//! - **Reward ledger**: transactional RC-cell accumulator with an
//!   append-only audit trail
//! - **Session engine**: a wall-clock-based countdown state machine that
//!   requires the caller to periodically invoke `tick()`
//! - **Storage**: injected remote-store and local-store contracts; SQLite
//!   for local durability, TOML for configuration
//!
//! ## Key Components
//!
//! - [`OfflineSyncQueue`]: offline-tolerant writes and reads
//! - [`RewardLedger`]: RC-cell awards and history
//! - [`SessionService`]: session lifecycle wired to queue, ledger, stats
//! - [`SessionContext`]: the per-sign-in service graph

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod session;
pub mod stats;
pub mod store;
pub mod sync;

pub use config::Config;
pub use context::SessionContext;
pub use error::{CoreError, LedgerError, LocalStoreError, StoreError};
pub use events::{Event, EventBus};
pub use ledger::{RewardKind, RewardLedger, RewardTransaction};
pub use notify::{LogNotifier, Notifier, ToastLevel};
pub use session::{
    EngineSnapshot, EngineState, SessionEngine, SessionKind, SessionService, SessionStatus,
};
pub use stats::{Stats, StatsRecorder};
pub use store::{LocalStore, MemoryStore, RemoteStore, SqliteStore};
pub use sync::{
    OfflineSyncQueue, OpKind, PendingOperation, ReadOutcome, SyncReport, SyncStatus, WriteOutcome,
};
