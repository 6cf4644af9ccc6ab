pub mod backend;
mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use backend::Backend;
pub use config::{Config, HistoryConfig, LoggingConfig, StorageConfig};
pub use memory::MemoryBackend;
pub use migrations::{Migration, Schema, StorageManager};
pub use sqlite::{SqliteBackend, SqliteDatabase, HISTORY_AREA, SETTINGS_AREA};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the pomotally data directory, creating it if needed.
///
/// `POMOTALLY_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/pomotally`, or `~/.config/pomotally-dev` when
/// `POMOTALLY_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("POMOTALLY_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("POMOTALLY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomotally-dev")
            } else {
                base_dir.join("pomotally")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
