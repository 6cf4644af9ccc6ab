//! Versioned payload migrations.
//!
//! Every stored payload carries a `version`. On load, payloads older than
//! the schema's current version are upgraded one step at a time through the
//! schema's migration table, and the result is written back immediately so
//! the cost is paid once.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::backend::{is_empty_payload, Backend};
use crate::error::{CoreError, HistoryError};
use crate::history::record::as_integer;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Upgrades a payload from version `from` to `from + 1`.
pub type MigrationFn = fn(Value) -> Result<Value, CoreError>;

/// One entry of a schema's migration table.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub from: u32,
    pub apply: MigrationFn,
}

/// Shape and history of one persisted payload type.
pub trait Schema: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// Current version; the terminal state of the migration chain.
    fn version(&self) -> u32;

    /// Payload adopted when the backend holds nothing.
    fn default_payload(&self) -> Value;

    /// Ordered upgrade steps. A missing step for a required transition is
    /// an integrity error.
    fn migrations(&self) -> &[Migration] {
        &[]
    }
}

/// Loads and saves one payload through a backend, migrating on the way.
pub struct StorageManager<S: Schema> {
    schema: S,
    backend: Arc<dyn Backend>,
    changes: broadcast::Sender<Value>,
}

impl<S: Schema> StorageManager<S> {
    pub fn new(schema: S, backend: Arc<dyn Backend>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            schema,
            backend,
            changes,
        }
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Load the payload, upgraded to the current version.
    ///
    /// # Errors
    /// Fails if the backend fails, the payload has no version, or a
    /// migration step is missing or misbehaves.
    pub async fn get(&self) -> Result<Value, CoreError> {
        let (payload, modified) = self.upgrade(self.backend.get().await?)?;
        if modified {
            self.backend.set(&payload).await?;
        }
        Ok(payload)
    }

    /// Store `payload` and notify subscribers.
    pub async fn set(&self, payload: Value) -> Result<(), CoreError> {
        let (payload, _) = self.upgrade(payload)?;
        self.backend.set(&payload).await?;
        // Nobody listening is fine.
        let _ = self.changes.send(payload);
        Ok(())
    }

    /// Receive every payload written through [`StorageManager::set`].
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.changes.subscribe()
    }

    /// Bring `payload` up to the current version.
    ///
    /// Returns the upgraded payload and whether anything changed.
    pub fn upgrade(&self, payload: Value) -> Result<(Value, bool), CoreError> {
        let mut modified = false;
        let mut payload = payload;

        if is_empty_payload(&payload) {
            info!(schema = self.schema.name(), "adopting default payload");
            payload = self.schema.default_payload();
            modified = true;
        }

        let mut version = read_version(&payload)
            .ok_or_else(|| HistoryError::VersionIntegrity("Missing version".into()))?;
        let current = self.schema.version();

        if version > current {
            warn!(
                schema = self.schema.name(),
                version, current, "payload is newer than this build understands"
            );
        }

        while version < current {
            let migration = self
                .schema
                .migrations()
                .iter()
                .find(|m| m.from == version)
                .ok_or_else(|| {
                    HistoryError::VersionIntegrity(format!(
                        "no migration from version {version} to {}",
                        version + 1
                    ))
                })?;

            payload = (migration.apply)(payload)?;

            let upgraded = read_version(&payload);
            if upgraded != Some(version + 1) {
                return Err(HistoryError::VersionIntegrity(format!(
                    "migration from version {version} produced {upgraded:?}, expected {}",
                    version + 1
                ))
                .into());
            }

            info!(schema = self.schema.name(), from = version, to = version + 1, "payload upgraded");
            version += 1;
            modified = true;
        }

        Ok((payload, modified))
    }
}

fn read_version(payload: &Value) -> Option<u32> {
    payload
        .get("version")
        .and_then(as_integer)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
}
