//! Persistence backend abstraction.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

/// Asynchronous key-value area holding one serialized payload.
///
/// Only single-call atomicity is assumed: `set` either replaces the whole
/// payload or fails without changing it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Current payload, or an empty JSON object when nothing is stored.
    async fn get(&self) -> Result<Value, StorageError>;

    async fn set(&self, payload: &Value) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

/// The value a backend returns for an area that has never been written.
pub fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Whether `payload` is the "nothing stored" marker.
pub fn is_empty_payload(payload: &Value) -> bool {
    payload.as_object().is_some_and(|map| map.is_empty())
}
