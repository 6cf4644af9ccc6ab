//! In-memory backend.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::backend::{empty_payload, Backend};
use crate::error::StorageError;

/// Backend keeping the payload in process memory.
#[derive(Debug)]
pub struct MemoryBackend {
    payload: RwLock<Value>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            payload: RwLock::new(empty_payload()),
        }
    }

    /// Start with `payload` already stored.
    pub fn with_payload(payload: Value) -> Self {
        Self {
            payload: RwLock::new(payload),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self) -> Result<Value, StorageError> {
        Ok(self.payload.read().await.clone())
    }

    async fn set(&self, payload: &Value) -> Result<(), StorageError> {
        *self.payload.write().await = payload.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.payload.write().await = empty_payload();
        Ok(())
    }
}
