//! Shared CLI plumbing: the sandbox session and output helpers.
//!
//! The CLI drives the real service graph against an in-process remote
//! store whose tree is persisted as JSON in the data directory between
//! invocations. The hosted backend's wire protocol stays out of scope;
//! this sandbox exercises every code path above it.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use blackreaper_core::store::{data_dir, LocalStore, MemoryStore, SqliteStore};
use blackreaper_core::{Config, Notifier, SessionContext, ToastLevel};

/// Local-store key holding the persisted engine snapshot.
const ENGINE_KEY: &str = "timer_engine";

/// Notifier printing toasts to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn toast(&self, level: ToastLevel, message: &str) {
        let tag = match level {
            ToastLevel::Info => "info",
            ToastLevel::Success => "ok",
            ToastLevel::Warning => "warn",
            ToastLevel::Error => "error",
        };
        eprintln!("[{tag}] {message}");
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// A signed-in CLI invocation over the sandbox store.
pub struct CliSession {
    pub ctx: SessionContext,
    remote: Arc<MemoryStore>,
    local: Arc<SqliteStore>,
    sandbox_path: PathBuf,
}

/// Build the session: load the sandbox tree, open local storage, sign in,
/// and restore the persisted engine state.
pub async fn open() -> Result<CliSession, Box<dyn Error>> {
    let user_id =
        std::env::var("BLACKREAPER_USER").unwrap_or_else(|_| "local".to_string());
    let sandbox_path = data_dir()?.join("sandbox.json");

    let remote = Arc::new(MemoryStore::new());
    if sandbox_path.exists() {
        let raw = std::fs::read_to_string(&sandbox_path)?;
        remote.import(serde_json::from_str(&raw)?);
    }

    let local = Arc::new(SqliteStore::open()?);
    let config = Config::load()?;

    let ctx = SessionContext::sign_in(
        user_id,
        Arc::clone(&remote) as _,
        Arc::clone(&local) as _,
        Arc::new(ConsoleNotifier),
        &config,
    )
    .await;

    if let Ok(Some(raw)) = local.get_item(ENGINE_KEY) {
        if let Err(e) = ctx.session().import_engine(&raw) {
            warn!(error = %e, "corrupt persisted engine state, starting fresh");
        }
    }

    Ok(CliSession {
        ctx,
        remote,
        local,
        sandbox_path,
    })
}

impl CliSession {
    /// Persist the engine snapshot and the sandbox tree for the next
    /// invocation.
    pub fn persist(&self) -> Result<(), Box<dyn Error>> {
        self.local
            .set_item(ENGINE_KEY, &self.ctx.session().export_engine())?;
        let raw = serde_json::to_string_pretty(&self.remote.export())?;
        std::fs::write(&self.sandbox_path, raw)?;
        Ok(())
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
