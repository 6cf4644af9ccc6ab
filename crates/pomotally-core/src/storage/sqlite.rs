//! SQLite-backed key-value storage.
//!
//! One `kv` row per storage area (`history`, `settings`), the payload kept
//! as JSON text. Every write is a single `INSERT OR REPLACE`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::backend::{empty_payload, Backend};
use super::data_dir;
use crate::error::StorageError;

/// Storage area holding the completion history.
pub const HISTORY_AREA: &str = "history";
/// Storage area holding the timer settings.
pub const SETTINGS_AREA: &str = "settings";

/// Shared SQLite connection.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open the database at `<data dir>/pomotally.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be
    /// opened, or the schema cannot be created.
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(&Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, StorageError> {
        Ok(data_dir()?.join("pomotally.db"))
    }

    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A backend handle bound to one storage area.
    pub fn area(&self, key: &str) -> SqliteBackend {
        SqliteBackend {
            conn: Arc::clone(&self.conn),
            key: key.to_string(),
        }
    }
}

/// [`Backend`] over one `kv` row.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    key: String,
}

impl SqliteBackend {
    pub fn key(&self) -> &str {
        &self.key
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        f(&conn)
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn get(&self) -> Result<Value, StorageError> {
        let stored: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![self.key],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match stored {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(empty_payload()),
        }
    }

    async fn set(&self, payload: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(payload)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![self.key, text],
            )?;
            Ok(())
        })
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![self.key])?;
            Ok(())
        })
    }
}
