//! INSERT/UPDATE/DELETE synthesis for buffered change events.
//!
//! Values are never inlined into the SQL text: every column value is
//! normalized and bound as a positional `?` parameter.

use sync_core::{normalize, ChangeEvent, DestinationValue, EventType, Result, Row, SinkError};

use crate::dialect::SqlDialect;
use crate::identifier::TableRef;

/// A parameterized statement ready for `DestinationTx::exec`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DestinationValue>,
}

/// Build the statement applying `event` to `table`.
///
/// Returns `Ok(None)` when there is nothing to apply: an insert without row
/// snapshots, or an update whose new row has no columns.
pub fn build_statement(
    dialect: SqlDialect,
    table: &TableRef,
    event: &ChangeEvent,
) -> Result<Option<Statement>> {
    match event.event_type {
        EventType::Insert => match event.new_row() {
            Some(row) => build_insert(dialect, table, row).map(Some),
            None => Ok(None),
        },
        EventType::Update => build_update(dialect, table, event),
        EventType::Delete => build_delete(dialect, table, event).map(Some),
    }
}

fn build_insert(dialect: SqlDialect, table: &TableRef, row: &Row) -> Result<Statement> {
    let target = dialect.qualified(table);
    if row.is_empty() {
        let sql = match dialect {
            SqlDialect::MySql => format!("INSERT INTO {target} () VALUES ()"),
            SqlDialect::Ansi => format!("INSERT INTO {target} DEFAULT VALUES"),
        };
        return Ok(Statement {
            sql,
            params: Vec::new(),
        });
    }

    let mut columns = Vec::with_capacity(row.len());
    let mut params = Vec::with_capacity(row.len());
    for (column, value) in row {
        columns.push(dialect.quote_ident(column));
        params.push(normalize(value)?);
    }
    let placeholders = vec!["?"; columns.len()].join(", ");

    Ok(Statement {
        sql: format!(
            "INSERT INTO {target} ({}) VALUES ({placeholders})",
            columns.join(", ")
        ),
        params,
    })
}

fn build_update(
    dialect: SqlDialect,
    table: &TableRef,
    event: &ChangeEvent,
) -> Result<Option<Statement>> {
    let (old, new) = match event.rows.as_slice() {
        [old, .., new] => (old, new),
        rows => {
            return Err(SinkError::MissingRows {
                event_type: event.event_type,
                table: table.to_string(),
                required: 2,
                found: rows.len(),
            })
        }
    };
    require_primary_keys(table, event)?;
    if new.is_empty() {
        return Ok(None);
    }

    let mut assignments = Vec::with_capacity(new.len());
    let mut params = Vec::with_capacity(new.len() + event.primary_keys.len());
    for (column, value) in new {
        assignments.push(format!("{} = ?", dialect.quote_ident(column)));
        params.push(normalize(value)?);
    }
    let predicate = where_clause(dialect, table, &event.primary_keys, old, "old", &mut params)?;

    Ok(Some(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {predicate}",
            dialect.qualified(table),
            assignments.join(", ")
        ),
        params,
    }))
}

fn build_delete(dialect: SqlDialect, table: &TableRef, event: &ChangeEvent) -> Result<Statement> {
    let Some(old) = event.old_row() else {
        return Err(SinkError::MissingRows {
            event_type: event.event_type,
            table: table.to_string(),
            required: 1,
            found: 0,
        });
    };
    require_primary_keys(table, event)?;

    let mut params = Vec::with_capacity(event.primary_keys.len());
    let predicate = where_clause(dialect, table, &event.primary_keys, old, "old", &mut params)?;

    Ok(Statement {
        sql: format!("DELETE FROM {} WHERE {predicate}", dialect.qualified(table)),
        params,
    })
}

fn require_primary_keys(table: &TableRef, event: &ChangeEvent) -> Result<()> {
    if event.primary_keys.is_empty() {
        return Err(SinkError::MissingPrimaryKey {
            event_type: event.event_type,
            table: table.to_string(),
        });
    }
    Ok(())
}

/// `pk1 = ? AND pk2 = ?`, with values taken from `row`. A NULL key value
/// becomes `IS NULL` so the predicate can still match.
fn where_clause(
    dialect: SqlDialect,
    table: &TableRef,
    primary_keys: &[String],
    row: &Row,
    image: &'static str,
    params: &mut Vec<DestinationValue>,
) -> Result<String> {
    let mut predicates = Vec::with_capacity(primary_keys.len());
    for key in primary_keys {
        let value = row
            .get(key)
            .ok_or_else(|| SinkError::PrimaryKeyColumnMissing {
                column: key.clone(),
                table: table.to_string(),
                image,
            })?;
        let column = dialect.quote_ident(key);
        if value.is_null() {
            predicates.push(format!("{column} IS NULL"));
        } else {
            predicates.push(format!("{column} = ?"));
            params.push(normalize(value)?);
        }
    }
    Ok(predicates.join(" AND "))
}
