//! # Pomotally Core Library
//!
//! Bookkeeping for completed pomodoros: the persisted completion history,
//! the statistics derived from it, and the timer settings. The CLI and any
//! other front end are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **History**: three index-aligned sequences (minute timestamps,
//!   durations, UTC offsets), the last two run-length encoded at rest
//! - **Storage**: versioned payloads behind a `Backend` trait (in-memory or
//!   SQLite), upgraded on load by a per-schema migration table, plus TOML
//!   configuration
//! - **Services**: a name-based dispatch boundary so another context can
//!   drive the stores through serialized calls
//!
//! ## Key Components
//!
//! - [`HistoryStore`]: add, merge, stats, CSV export
//! - [`StorageManager`]: migration-aware payload access
//! - [`SettingsStore`]: validated timer settings
//! - [`ServiceBroker`]: remote-invocation routing

pub mod error;
pub mod history;
pub mod mutex;
pub mod page;
pub mod service;
pub mod settings;
pub mod storage;

pub use error::{CoreError, HistoryError, ServiceError, StorageError, ValidationError};
pub use history::{
    Clock, Completion, FixedClock, HistoryEntries, HistoryRecord, HistoryStore, Rle, Stats,
    SystemClock,
};
pub use mutex::AsyncMutex;
pub use page::PageHost;
pub use service::{
    Call, HistoryClient, HistoryService, Reply, Service, ServiceBroker, SettingsClient,
    SettingsService,
};
pub use settings::{Settings, SettingsStore};
pub use storage::{Backend, Config, MemoryBackend, SqliteBackend, SqliteDatabase, StorageManager};
