//! Replication-position checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sync_core::ReplicationPosition;

use crate::Checkpoint;

/// The last replication position whose events are durably applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkCheckpoint {
    pub position: ReplicationPosition,
    pub committed_at: DateTime<Utc>,
}

impl SinkCheckpoint {
    pub fn new(position: ReplicationPosition) -> Self {
        Self {
            position,
            committed_at: Utc::now(),
        }
    }
}

impl Checkpoint for SinkCheckpoint {
    const DATABASE_TYPE: &'static str = "binlog";

    fn to_cli_string(&self) -> String {
        self.position.to_string()
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        Ok(Self::new(s.parse()?))
    }
}
