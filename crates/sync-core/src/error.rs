//! Error types shared by the sink adapters.

use thiserror::Error;

use crate::event::EventType;

/// Errors raised while turning a change event into a destination statement
/// or while applying it.
///
/// Every variant is fatal to the statement that raised it, and therefore to
/// the table group containing that statement.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The event carries fewer row snapshots than its type requires.
    #[error("{event_type} on {table} needs at least {required} row snapshot(s), found {found}")]
    MissingRows {
        event_type: EventType,
        table: String,
        required: usize,
        found: usize,
    },

    /// Update/delete without primary-key columns.
    #[error("no primary key found for {event_type} on {table}")]
    MissingPrimaryKey { event_type: EventType, table: String },

    /// A primary-key column is absent from the row snapshot used for the WHERE clause.
    #[error("primary key column '{column}' not found in {image} row of {table}")]
    PrimaryKeyColumnMissing {
        column: String,
        table: String,
        image: &'static str,
    },

    /// A composite value could not be serialized to JSON.
    #[error("failed to serialize value as JSON: {0}")]
    Normalization(#[from] serde_json::Error),

    /// A value in the input could not be interpreted.
    #[error("invalid row value: {0}")]
    InvalidValue(String),

    /// The destination rejected a begin/exec/commit/DDL call.
    #[error("destination error: {0:#}")]
    Destination(anyhow::Error),
}

impl SinkError {
    /// Whether this error comes from a malformed event rather than the destination.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingRows { .. }
                | Self::MissingPrimaryKey { .. }
                | Self::PrimaryKeyColumnMissing { .. }
        )
    }
}

impl From<anyhow::Error> for SinkError {
    fn from(err: anyhow::Error) -> Self {
        Self::Destination(err)
    }
}

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
