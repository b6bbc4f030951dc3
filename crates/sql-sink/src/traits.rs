//! Destination trait definitions.
//!
//! The committer opens one transaction per table group, executes the group's
//! statements in order and then commits or rolls back. Schema-change
//! statements and connectivity checks go through the destination directly.

use anyhow::Result;
use sql_types::TableRef;
use sync_core::{DestinationValue, Row};

/// A SQL destination able to run transactions.
///
/// # Usage Pattern
///
/// The connector is generic over its destination, so every call is
/// statically dispatched after monomorphization:
///
/// ```ignore
/// pub struct Connector<D: Destination + TableCreator> {
///     destination: D,
///     // ...
/// }
/// ```
#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn DestinationTx>>;

    /// Execute a statement outside any transaction (forwarded DDL).
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Check that the destination is reachable.
    async fn ping(&self) -> Result<()>;

    /// Release the destination's connections.
    async fn close(&self) -> Result<()>;
}

/// An open destination transaction.
///
/// Dropping a transaction without calling `commit` or `rollback` leaves the
/// outcome to the driver; the committer always calls one of them.
#[async_trait::async_trait]
pub trait DestinationTx: Send {
    /// Execute one statement with positional `?` parameters, returning the
    /// affected row count.
    async fn exec(&mut self, sql: &str, params: &[DestinationValue]) -> Result<u64>;

    /// Commit the transaction.
    ///
    /// `commit` consumes the handle, so the caller cannot roll back after a
    /// failed commit: implementations must leave the transaction rolled back
    /// whenever they return an error.
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Creates destination tables on demand.
#[async_trait::async_trait]
pub trait TableCreator: Send + Sync {
    /// Make sure `table` exists, inferring column types from `sample`.
    async fn ensure_table(
        &self,
        table: &TableRef,
        sample: &Row,
        primary_keys: &[String],
    ) -> Result<()>;
}
