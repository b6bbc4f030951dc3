//! Commit acknowledgements handed back to the upstream dispatcher.

use crate::error::SinkError;
use crate::event::{ChangeEvent, RawStatement, ReplicationPosition};

/// Result of a flush or of a forwarded DDL statement.
///
/// A flush either committed every table group or failed; both never hold for
/// the same flush. Connector entry points return `Option<CommitOutcome>`,
/// where `None` means nothing was flushed or forwarded.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Every table group committed; `last_success` is the final event of the batch.
    Committed { last_success: ChangeEvent },

    /// A table group failed and was rolled back; `first_failed` is that group's first event.
    Failed {
        first_failed: ChangeEvent,
        error: SinkError,
    },

    /// A DDL statement was forwarded to the destination.
    ///
    /// `flushed` is the last event of the batch committed just before it.
    StatementApplied {
        statement: RawStatement,
        flushed: Option<ChangeEvent>,
    },

    /// Forwarding a DDL statement failed. Events in `flushed` and before it
    /// were still committed.
    StatementFailed {
        statement: RawStatement,
        flushed: Option<ChangeEvent>,
        error: SinkError,
    },
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Committed { .. } | Self::StatementApplied { .. })
    }

    /// Last committed event, including the flush that preceded a DDL statement.
    pub fn last_success(&self) -> Option<&ChangeEvent> {
        match self {
            Self::Committed { last_success } => Some(last_success),
            Self::StatementApplied { flushed, .. } | Self::StatementFailed { flushed, .. } => {
                flushed.as_ref()
            }
            Self::Failed { .. } => None,
        }
    }

    pub fn first_failed(&self) -> Option<&ChangeEvent> {
        match self {
            Self::Failed { first_failed, .. } => Some(first_failed),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SinkError> {
        match self {
            Self::Failed { error, .. } | Self::StatementFailed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Replication position that may be acknowledged, if this outcome is a success.
    pub fn success_position(&self) -> Option<&ReplicationPosition> {
        match self {
            Self::Committed { last_success } => last_success.position.as_ref(),
            Self::StatementApplied { statement, .. } => statement.position.as_ref(),
            _ => None,
        }
    }

    /// Position of the batch flushed ahead of a DDL statement. It was
    /// committed whether or not the statement itself succeeded.
    pub fn flushed_position(&self) -> Option<&ReplicationPosition> {
        match self {
            Self::StatementApplied { flushed, .. } | Self::StatementFailed { flushed, .. } => {
                flushed.as_ref().and_then(|event| event.position.as_ref())
            }
            _ => None,
        }
    }

    /// Replication position that must not be acknowledged, if this outcome is a failure.
    pub fn failure_position(&self) -> Option<&ReplicationPosition> {
        match self {
            Self::Failed { first_failed, .. } => first_failed.position.as_ref(),
            Self::StatementFailed { statement, .. } => statement.position.as_ref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Committed { last_success } => {
                write!(f, "committed through {}", last_success.source_table())
            }
            Self::Failed {
                first_failed,
                error,
            } => write!(
                f,
                "failed at {} {}: {error}",
                first_failed.event_type,
                first_failed.source_table()
            ),
            Self::StatementApplied { statement, .. } => write!(f, "applied '{}'", statement.sql),
            Self::StatementFailed {
                statement, error, ..
            } => write!(f, "failed to apply '{}': {error}", statement.sql),
        }
    }
}
