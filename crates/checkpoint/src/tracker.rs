//! Replication-position tracking.
//!
//! The tracker consumes commit outcomes and persists the latest successfully
//! applied position. Once a failure is reported, nothing at or beyond the
//! failed event's position is persisted until the failure is resolved, so a
//! restart always replays the failed events.

use anyhow::{Context, Result};
use sync_core::{CommitOutcome, ReplicationPosition};

use crate::file::CheckpointFile;
use crate::position::SinkCheckpoint;
use crate::store::{CheckpointID, CheckpointStore};
use crate::Checkpoint;

/// What an unresolved failure holds back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hold {
    /// Positions at or beyond this one.
    At(ReplicationPosition),
    /// Every position; the failed event carried none.
    Everything,
}

impl Hold {
    pub fn blocks(&self, position: &ReplicationPosition) -> bool {
        match self {
            Self::At(barrier) => position >= barrier,
            Self::Everything => true,
        }
    }

    fn tighten(self, other: Self) -> Self {
        match (self, other) {
            (Self::At(a), Self::At(b)) => Self::At(a.min(b)),
            _ => Self::Everything,
        }
    }
}

/// Turns commit outcomes into a durable checkpoint.
pub struct PositionTracker {
    store: Box<dyn CheckpointStore>,
    id: CheckpointID,
    committed: Option<ReplicationPosition>,
    hold: Option<Hold>,
}

impl PositionTracker {
    /// Create a tracker for pipeline `name`, resuming from any stored checkpoint.
    pub async fn load(store: Box<dyn CheckpointStore>, name: impl Into<String>) -> Result<Self> {
        let id = CheckpointID::new(SinkCheckpoint::DATABASE_TYPE, name);
        let committed = match store.read_checkpoint(&id).await? {
            Some(stored) => {
                let checkpoint: SinkCheckpoint = CheckpointFile::from_stored(&stored)?
                    .parse()
                    .with_context(|| format!("Failed to parse checkpoint '{}'", id.name))?;
                tracing::info!(
                    "Loaded checkpoint '{}' at {}",
                    id.name,
                    checkpoint.to_cli_string()
                );
                Some(checkpoint.position)
            }
            None => None,
        };

        Ok(Self {
            store,
            id,
            committed,
            hold: None,
        })
    }

    /// Last persisted position.
    pub fn committed(&self) -> Option<&ReplicationPosition> {
        self.committed.as_ref()
    }

    /// The unresolved failure, if any.
    pub fn hold(&self) -> Option<&Hold> {
        self.hold.as_ref()
    }

    /// Whether the event at `position` was already applied by an earlier run.
    pub fn is_applied(&self, position: &ReplicationPosition) -> bool {
        self.committed.as_ref().is_some_and(|c| position <= c)
    }

    /// Record one outcome. Returns `true` if the checkpoint advanced.
    ///
    /// A batch flushed ahead of a DDL statement is acknowledged before the
    /// statement's own result, so a failed statement still checkpoints the
    /// rows committed before it.
    pub async fn observe(&mut self, outcome: &CommitOutcome) -> Result<bool> {
        let mut advanced = match outcome.flushed_position() {
            Some(position) => self.advance(position).await?,
            None => false,
        };

        if !outcome.is_success() {
            let hold = match outcome.failure_position() {
                Some(position) => Hold::At(position.clone()),
                None => Hold::Everything,
            };
            tracing::warn!("Holding checkpoint after failure: {outcome}");
            self.hold = Some(match self.hold.take() {
                Some(existing) => existing.tighten(hold),
                None => hold,
            });
            return Ok(advanced);
        }

        if let Some(position) = outcome.success_position() {
            advanced |= self.advance(position).await?;
        }
        Ok(advanced)
    }

    /// Clear the failure hold once the failed events have been dealt with.
    pub fn resolve_failure(&mut self) {
        if let Some(hold) = self.hold.take() {
            tracing::info!("Failure hold {hold:?} resolved");
        }
    }

    async fn advance(&mut self, position: &ReplicationPosition) -> Result<bool> {
        if let Some(hold) = &self.hold {
            if hold.blocks(position) {
                tracing::debug!("Not advancing checkpoint to {position} past an unresolved failure");
                return Ok(false);
            }
        }
        if self.is_applied(position) {
            return Ok(false);
        }
        self.persist(position.clone()).await?;
        Ok(true)
    }

    async fn persist(&mut self, position: ReplicationPosition) -> Result<()> {
        let checkpoint = SinkCheckpoint::new(position);
        let file = CheckpointFile::new(&checkpoint)?;
        self.store
            .store_checkpoint(&self.id, serde_json::to_string(&file)?)
            .await
            .with_context(|| format!("Failed to store checkpoint '{}'", self.id.name))?;
        tracing::info!("Checkpoint advanced to {}", checkpoint.to_cli_string());
        self.committed = Some(checkpoint.position);
        Ok(())
    }
}
