//! Local durable key-value storage.
//!
//! Persists the pending-operation queue, cached reads, and the timer
//! engine snapshot across process restarts. Writes are synchronous:
//! whole-value snapshots are durable before the calling operation
//! returns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::LocalStoreError;
use super::data_dir;

/// Durable string key-value store surviving restarts.
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;
    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError>;
    fn keys(&self) -> Result<Vec<String>, LocalStoreError>;
}

/// SQLite-backed [`LocalStore`].
///
/// A single `kv` table at `~/.config/blackreaper/blackreaper.db`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store at the default data directory.
    pub fn open() -> Result<Self, LocalStoreError> {
        let path = data_dir()
            .map_err(|e| LocalStoreError::QueryFailed(e.to_string()))?
            .join("blackreaper.db");
        Self::open_at(&path)
    }

    /// Open the store at a specific path (for tests).
    pub fn open_at(path: &Path) -> Result<Self, LocalStoreError> {
        let conn = Connection::open(path).map_err(|source| LocalStoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests).
    pub fn open_memory() -> Result<Self, LocalStoreError> {
        let conn = Connection::open_in_memory().map_err(|source| LocalStoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), LocalStoreError> {
        self.conn.lock().unwrap().execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl LocalStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.conn.lock().unwrap().execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, LocalStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}

/// In-memory [`LocalStore`] for tests.
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
    /// When set, every write fails (storage-exhaustion simulation).
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, as a full or broken device would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(LocalStoreError::QueryFailed("storage exhausted".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, LocalStoreError> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.get_item("a").unwrap(), None);

        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        assert_eq!(store.get_item("a").unwrap(), Some("1".to_string()));

        store.set_item("a", "3").unwrap();
        assert_eq!(store.get_item("a").unwrap(), Some("3".to_string()));

        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        store.remove_item("a").unwrap();
        assert_eq!(store.get_item("a").unwrap(), None);
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kv.db");
        {
            let store = SqliteStore::open_at(&path).unwrap();
            store.set_item("queue", "[]").unwrap();
        }
        let store = SqliteStore::open_at(&path).unwrap();
        assert_eq!(store.get_item("queue").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn memory_store_failure_injection() {
        let store = MemoryLocalStore::new();
        store.set_item("a", "1").unwrap();
        store.set_fail_writes(true);
        assert!(store.set_item("b", "2").is_err());
        // Reads still work in the degraded state.
        assert_eq!(store.get_item("a").unwrap(), Some("1".to_string()));
    }
}
