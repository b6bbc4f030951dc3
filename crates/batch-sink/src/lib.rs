//! Buffered, grouped transactional sink for row-level change events.
//!
//! A [`Connector`] accepts change events from an upstream dispatcher, buffers
//! them, and commits them in batches: each flush is partitioned by resolved
//! destination table and every partition is applied in its own transaction.
//! The outcome of each flush is reported back as a
//! [`sync_core::CommitOutcome`] so the caller can advance (or hold) its
//! replication checkpoint.
//!
//! A flush is triggered by:
//!
//! - the buffer reaching the configured batch size
//! - an explicit commit signal
//! - the idle timer of a [`Dispatcher`]
//! - a schema change arriving as raw SQL, which is then forwarded
//!
//! # Example
//!
//! ```rust,no_run
//! use batch_sink::{Connector, ConnectorConfig};
//! use sql_sink::MemoryDestination;
//! use sync_core::{row, ChangeEvent};
//!
//! # async fn run() {
//! let mut connector = Connector::new(ConnectorConfig::default(), MemoryDestination::default());
//! connector
//!     .insert(ChangeEvent::insert("shop", "orders", row! { "id" => 1 }), false)
//!     .await;
//! let outcome = connector.commit(false).await;
//! assert!(outcome.is_some_and(|o| o.is_success()));
//! # }
//! ```

pub mod buffer;
pub mod committer;
pub mod config;
pub mod connector;
pub mod dispatch;

pub use buffer::{EventBuffer, PendingBatch};
pub use committer::GroupedCommitter;
pub use config::{ConnectorConfig, FailurePolicy, DEFAULT_BATCH_SIZE, DEFAULT_IDLE_TIMEOUT};
pub use connector::Connector;
pub use dispatch::{Dispatcher, DispatcherHandle};
