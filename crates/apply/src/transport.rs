//! The seam to whatever persists status patches.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use logop_core::ResourceKey;
use serde_json::Value as Json;
use thiserror::Error;

use crate::diff::status_patch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("status patch cancelled")]
    Cancelled,
    #[error("status patch timed out after {0:?}")]
    Timeout(Duration),
    #[error("status patch failed: {0}")]
    Transport(String),
}

/// Persists the status difference between two snapshots of one object.
///
/// Implementations must be idempotent for a repeated `(before, after)` pair.
#[async_trait]
pub trait PatchTransport: Send + Sync {
    async fn apply_status_patch(&self, key: &ResourceKey, before: &Json, after: &Json) -> Result<(), PatchError>;
}

/// Records patches instead of sending them. Backs offline validation.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sent: Mutex<Vec<(ResourceKey, Json)>>,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches recorded so far, in submission order.
    pub fn sent(&self) -> Vec<(ResourceKey, Json)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take(&self) -> Vec<(ResourceKey, Json)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl PatchTransport for DryRunTransport {
    async fn apply_status_patch(&self, key: &ResourceKey, before: &Json, after: &Json) -> Result<(), PatchError> {
        if let Some(patch) = status_patch(before, after) {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).push((key.clone(), patch));
        }
        Ok(())
    }
}
