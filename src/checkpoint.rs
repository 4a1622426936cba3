//! Durable single-value progress marker.
//!
//! The marker is best-effort for resumability, not correctness-critical
//! within a run: a failed save is logged and swallowed, and an unreadable
//! marker means "start fresh", never a fatal error.

use crate::store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointPayload {
    last_completed_page: u64,
}

pub struct CheckpointStore {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn ObjectStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// The highest fully processed page from a previous run, if any.
    pub async fn load(&self) -> Option<u64> {
        let bytes = match self.store.get(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Checkpoint load failed, starting fresh");
                return None;
            }
        };

        match serde_json::from_slice::<CheckpointPayload>(&bytes) {
            Ok(payload) => Some(payload.last_completed_page),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Checkpoint unreadable, starting fresh");
                None
            }
        }
    }

    /// Persist the marker, overwriting any prior value. Failures are logged
    /// and swallowed; in-memory progress continues regardless.
    pub async fn save(&self, last_completed_page: u64) {
        let payload = CheckpointPayload {
            last_completed_page,
        };
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Checkpoint serialization failed");
                return;
            }
        };

        match self.store.put(&self.key, bytes).await {
            Ok(()) => debug!(last_completed_page, "Checkpoint saved"),
            Err(e) => {
                warn!(last_completed_page, error = %e, "Checkpoint save failed, progress not persisted");
            }
        }
    }

    /// Remove the marker so the next run starts from page 1.
    pub async fn reset(&self) -> Result<(), crate::store::StoreError> {
        self.store.delete(&self.key).await
    }
}
