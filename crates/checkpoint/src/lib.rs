//! Checkpoint management for cdc-sink
//!
//! Tracks how far the upstream replication stream has been durably applied,
//! so a restarted pipeline can resume without skipping failed events.
//!
//! # Architecture
//!
//! - `Checkpoint` trait for serializable checkpoint types
//! - `CheckpointFile` wrapper for storage-agnostic serialization
//! - `CheckpointStore` trait with `FilesystemStore` and `NullStore` backends
//! - `PositionTracker` turning commit outcomes into persisted checkpoints
//!
//! The only checkpoint type today is [`SinkCheckpoint`], a binlog
//! `file:offset` position.

mod file;
mod filesystem;
mod position;
pub mod store;
mod tracker;

#[cfg(test)]
mod tests;

pub use file::CheckpointFile;
pub use filesystem::FilesystemStore;
pub use position::SinkCheckpoint;
pub use store::{CheckpointID, CheckpointStore, NullStore, StoredCheckpoint};
pub use tracker::{Hold, PositionTracker};

/// Trait that checkpoint types must implement.
///
/// # Example
///
/// ```rust
/// use checkpoint::Checkpoint;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct SequenceCheckpoint {
///     pub sequence: u64,
/// }
///
/// impl Checkpoint for SequenceCheckpoint {
///     const DATABASE_TYPE: &'static str = "sequence";
///
///     fn to_cli_string(&self) -> String {
///         self.sequence.to_string()
///     }
///
///     fn from_cli_string(s: &str) -> anyhow::Result<Self> {
///         Ok(Self { sequence: s.parse()? })
///     }
/// }
/// ```
pub trait Checkpoint: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone {
    /// Checkpoint type identifier.
    ///
    /// Stored alongside the serialized checkpoint and validated on load.
    const DATABASE_TYPE: &'static str;

    /// Convert to CLI-friendly string format.
    ///
    /// The returned string should be parseable by `from_cli_string()`.
    fn to_cli_string(&self) -> String;

    /// Parse from CLI string format.
    fn from_cli_string(s: &str) -> anyhow::Result<Self>
    where
        Self: Sized;
}
