//! Storage contracts and implementations.
//!
//! The remote data store and the local durable key-value store are both
//! injected collaborators: the core never talks to a concrete backend
//! directly. [`MemoryStore`] is the in-process remote used by tests and
//! the CLI sandbox; [`SqliteStore`] is the durable local store.

pub mod local;
pub mod memory;
pub mod paths;
pub mod remote;

pub use local::{LocalStore, MemoryLocalStore, SqliteStore};
pub use memory::MemoryStore;
pub use remote::{RemoteStore, Snapshot, Subscription, TransactionOutcome};

use std::path::PathBuf;

/// Returns `~/.config/blackreaper[-dev]/` based on BLACKREAPER_ENV.
///
/// Set BLACKREAPER_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BLACKREAPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("blackreaper-dev")
    } else {
        base_dir.join("blackreaper")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
