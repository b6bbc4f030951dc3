//! Checkpoint file wrapper for storage-agnostic serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoredCheckpoint;
use crate::Checkpoint;

/// Storage-agnostic checkpoint file wrapper.
///
/// # File Format
///
/// ```json
/// {
///     "database_type": "binlog",
///     "checkpoint": {
///         "position": { "file": "mysql-bin.000003", "offset": 4711 },
///         "committed_at": "2024-01-01T00:00:00Z"
///     },
///     "created_at": "2024-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    /// Checkpoint type identifier
    pub database_type: String,
    /// Serialized checkpoint data as JSON Value
    pub checkpoint: serde_json::Value,
    /// Timestamp when this checkpoint file was created
    pub created_at: DateTime<Utc>,
}

impl CheckpointFile {
    /// Wrap a checkpoint.
    pub fn new<C: Checkpoint>(checkpoint: &C) -> anyhow::Result<Self> {
        Ok(Self {
            database_type: C::DATABASE_TYPE.to_string(),
            checkpoint: serde_json::to_value(checkpoint)?,
            created_at: Utc::now(),
        })
    }

    /// Decode the file held by a stored checkpoint.
    pub fn from_stored(stored: &StoredCheckpoint) -> anyhow::Result<Self> {
        let file: Self = serde_json::from_str(&stored.checkpoint_data)?;
        if file.database_type != stored.database_type {
            anyhow::bail!(
                "Stored checkpoint '{}' is labelled '{}' but holds '{}'",
                stored.name,
                stored.database_type,
                file.database_type
            );
        }
        Ok(file)
    }

    /// Parse checkpoint into its concrete type.
    ///
    /// Fails if the stored `database_type` doesn't match `C::DATABASE_TYPE`
    /// or the data can't be deserialized into `C`.
    pub fn parse<C: Checkpoint>(&self) -> anyhow::Result<C> {
        if self.database_type != C::DATABASE_TYPE {
            anyhow::bail!(
                "Checkpoint type mismatch: expected '{}', found '{}'",
                C::DATABASE_TYPE,
                self.database_type
            );
        }
        Ok(serde_json::from_value(self.checkpoint.clone())?)
    }

    pub fn database_type(&self) -> &str {
        &self.database_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
