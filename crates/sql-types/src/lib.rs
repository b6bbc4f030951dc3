//! SQL-facing helpers for cdc-sink.
//!
//! This crate turns sync-core change events into SQL text for a destination,
//! and decides what to do with raw SQL arriving from statement-based
//! replication.
//!
//! # Structure
//!
//! - `dialect`: Identifier quoting per destination family
//! - `identifier`: Resolve `(schema, table)` from event names or qualified SQL names
//! - `classify`: Shallow statement-kind classification of raw SQL
//! - `statement`: INSERT/UPDATE/DELETE synthesis with bound parameters
//! - `ddl`: Auto-create DDL and translation of forwarded DDL
//!
//! # Example
//!
//! ```rust
//! use sql_types::{classify, IdentifierResolver, StatementKind};
//!
//! assert_eq!(classify("  savepoint sp1 "), StatementKind::NonDdl);
//! assert_eq!(classify("ALTER TABLE t ADD c INT"), StatementKind::Ddl);
//!
//! let resolver = IdentifierResolver::default();
//! let table = resolver.resolve("`bifrost_test`.`t`", "test");
//! assert_eq!((table.schema.as_str(), table.table.as_str()), ("bifrost_test", "t"));
//! ```

pub mod classify;
pub mod ddl;
pub mod dialect;
pub mod identifier;
pub mod statement;

pub use classify::{classify, is_row_shaped, StatementKind};
pub use ddl::{translate_ddl, ToDdl, TranslatedDdl};
pub use dialect::SqlDialect;
pub use identifier::{parse_qualified, IdentifierResolver, TableRef};
pub use statement::{build_statement, Statement};
