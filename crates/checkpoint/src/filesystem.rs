//! Filesystem-based checkpoint storage implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::store::{CheckpointID, CheckpointStore, StoredCheckpoint};

/// Filesystem implementation of CheckpointStore trait.
///
/// Keeps one JSON file per checkpoint name, `checkpoint_{name}.json`.
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a truncated checkpoint behind.
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &CheckpointID) -> PathBuf {
        self.dir.join(format!("checkpoint_{}.json", id.name))
    }
}

#[async_trait]
impl CheckpointStore for FilesystemStore {
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create checkpoint directory {}", self.dir.display())
        })?;

        let stored = StoredCheckpoint {
            checkpoint_data,
            database_type: id.database_type.clone(),
            name: id.name.clone(),
            created_at: Utc::now(),
        };

        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&stored)?)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move checkpoint into {}", path.display()))?;

        tracing::debug!("Stored checkpoint to {}", path.display());
        Ok(())
    }

    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let stored: StoredCheckpoint = serde_json::from_str(&content)
            .with_context(|| format!("Malformed checkpoint file {}", path.display()))?;
        if stored.database_type != id.database_type {
            anyhow::bail!(
                "Checkpoint {} has type '{}', expected '{}'",
                path.display(),
                stored.database_type,
                id.database_type
            );
        }
        Ok(Some(stored))
    }
}
