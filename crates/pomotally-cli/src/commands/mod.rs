pub mod config;
pub mod history;
pub mod settings;

use std::sync::Arc;

use pomotally_core::error::StorageError;
use pomotally_core::storage::{HISTORY_AREA, SETTINGS_AREA};
use pomotally_core::{Config, HistoryStore, SettingsStore, SqliteDatabase};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn open_database(config: &Config) -> Result<SqliteDatabase, StorageError> {
    let path = config.database_path()?;
    tracing::debug!(path = %path.display(), "opening database");
    SqliteDatabase::open(&path)
}

pub(crate) fn open_history(config: &Config) -> Result<HistoryStore, StorageError> {
    let db = open_database(config)?;
    let store = HistoryStore::new(Arc::new(db.area(HISTORY_AREA)));
    Ok(store.with_week_start(config.history.week_start))
}

pub(crate) fn open_settings(config: &Config) -> Result<SettingsStore, StorageError> {
    let db = open_database(config)?;
    Ok(SettingsStore::new(Arc::new(db.area(SETTINGS_AREA))))
}
