//! Checkpoint storage trait and types
//!
//! This module defines the CheckpointStore trait for backend-agnostic
//! checkpoint storage operations, plus shared types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Checkpoint identifier for storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointID {
    /// Checkpoint type (e.g., "binlog")
    pub database_type: String,
    /// Pipeline name; one checkpoint is kept per name
    pub name: String,
}

impl CheckpointID {
    pub fn new(database_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database_type: database_type.into(),
            name: name.into(),
        }
    }
}

/// Checkpoint data stored in backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCheckpoint {
    /// Serialized checkpoint (a `CheckpointFile` as JSON)
    pub checkpoint_data: String,
    /// Checkpoint type for validation
    pub database_type: String,
    /// Pipeline name for validation
    pub name: String,
    /// Timestamp when checkpoint was stored
    pub created_at: DateTime<Utc>,
}

/// Trait for checkpoint storage operations.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Store a checkpoint, replacing any previous one with the same id.
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()>;

    /// Read a checkpoint from the storage backend.
    ///
    /// Returns None if the checkpoint doesn't exist.
    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>>;
}

/// Store that keeps nothing. Used when checkpointing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

#[async_trait]
impl CheckpointStore for NullStore {
    async fn store_checkpoint(&self, id: &CheckpointID, _checkpoint_data: String) -> Result<()> {
        tracing::debug!("Checkpointing disabled; not storing {}", id.name);
        Ok(())
    }

    async fn read_checkpoint(&self, _id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        Ok(None)
    }
}
