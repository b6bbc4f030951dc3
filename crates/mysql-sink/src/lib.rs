//! MySQL destination for cdc-sink.
//!
//! Implements the `sql-sink` destination traits on top of a `mysql_async`
//! connection pool. Each table group runs in its own pooled transaction;
//! forwarded DDL and auto-created tables run on a plain pooled connection.

mod destination;
mod value;

pub use destination::{sanitize_connection_string, MySqlDestination};
pub use value::MySQLValue;
