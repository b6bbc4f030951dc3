//! Destination trait abstraction for transactional SQL sinks.
//!
//! This crate defines the `Destination` / `DestinationTx` traits that the
//! grouped committer drives, plus the `TableCreator` collaborator used for
//! auto-creating destination tables. `mysql-sink` implements them for MySQL;
//! `MemoryDestination` records everything in memory for tests and dry runs.
//!
//! Values cross the trait boundary as sync-core `DestinationValue`s so that
//! drivers never see the upstream `RowValue` representation.

mod memory;
mod traits;

pub use memory::{MemoryDestination, RecordedStatement, RecordedTx, TxState};
pub use traits::{Destination, DestinationTx, TableCreator};
