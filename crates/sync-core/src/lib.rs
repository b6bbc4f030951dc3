//! Core types for the cdc-sink framework.
//!
//! This crate provides the foundational types shared by every sink adapter:
//!
//! - [`RowValue`] / [`Row`] - Dynamically-typed column values as delivered upstream
//! - [`ChangeEvent`] - One row-level insert/update/delete
//! - [`RawStatement`] - Raw SQL text from statement-based replication
//! - [`DestinationValue`] - Destination-safe values produced by [`normalize`]
//! - [`CommitOutcome`] - The result of a flush or a forwarded statement
//! - [`SinkError`] - Validation, normalization and destination failures
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── sql-types     (dialects, identifiers, classifier, statement synthesis)
//!    ├─── sql-sink      (destination traits)
//!    ├─── batch-sink    (buffer, grouped committer, connector)
//!    └─── checkpoint    (replication-position tracking)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{normalize, DestinationValue, RowValue};
//!
//! let value = RowValue::Bytes(b"hello".to_vec());
//! assert_eq!(
//!     normalize(&value).unwrap(),
//!     DestinationValue::Text("hello".to_string())
//! );
//! ```

pub mod error;
pub mod event;
pub mod normalize;
pub mod outcome;
pub mod values;

pub use error::{Result, SinkError};
pub use event::{ChangeEvent, EventType, RawStatement, ReplicationPosition, SourceMessage};
pub use normalize::{normalize, DestinationValue};
pub use outcome::CommitOutcome;
pub use values::{Row, RowValue};
