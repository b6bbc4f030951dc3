//! Change events and raw statements emitted by the upstream source.

use serde::{Deserialize, Serialize};

use crate::values::Row;

/// Kind of row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an event in the source replication log.
///
/// Ordered by log file name, then by offset within the file. Binlog file names
/// carry a zero-padded sequence number, so lexicographic order is log order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicationPosition {
    pub file: String,
    pub offset: u64,
}

impl ReplicationPosition {
    pub fn new(file: impl Into<String>, offset: u64) -> Self {
        Self {
            file: file.into(),
            offset,
        }
    }
}

impl std::fmt::Display for ReplicationPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.offset)
    }
}

impl std::str::FromStr for ReplicationPosition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, offset) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid position '{s}'. Expected 'file:offset'"))?;
        if file.is_empty() {
            anyhow::bail!("Invalid position '{s}': empty file name");
        }
        let offset = offset
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid offset in position '{s}': {e}"))?;
        Ok(Self::new(file, offset))
    }
}

/// One row-level change.
///
/// `rows` holds the snapshots: `[new]` for inserts, `[old]` for deletes and
/// `[old, new]` for updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: EventType,
    pub schema_name: String,
    pub table_name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default, alias = "pri")]
    pub primary_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ReplicationPosition>,
}

impl ChangeEvent {
    pub fn insert(schema: impl Into<String>, table: impl Into<String>, row: Row) -> Self {
        Self {
            event_type: EventType::Insert,
            schema_name: schema.into(),
            table_name: table.into(),
            rows: vec![row],
            primary_keys: Vec::new(),
            position: None,
        }
    }

    pub fn update(
        schema: impl Into<String>,
        table: impl Into<String>,
        old: Row,
        new: Row,
        primary_keys: &[&str],
    ) -> Self {
        Self {
            event_type: EventType::Update,
            schema_name: schema.into(),
            table_name: table.into(),
            rows: vec![old, new],
            primary_keys: primary_keys.iter().map(|k| k.to_string()).collect(),
            position: None,
        }
    }

    pub fn delete(
        schema: impl Into<String>,
        table: impl Into<String>,
        old: Row,
        primary_keys: &[&str],
    ) -> Self {
        Self {
            event_type: EventType::Delete,
            schema_name: schema.into(),
            table_name: table.into(),
            rows: vec![old],
            primary_keys: primary_keys.iter().map(|k| k.to_string()).collect(),
            position: None,
        }
    }

    pub fn with_primary_keys(mut self, primary_keys: &[&str]) -> Self {
        self.primary_keys = primary_keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_position(mut self, position: ReplicationPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// The pre-image (first snapshot).
    pub fn old_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// The post-image (last snapshot).
    pub fn new_row(&self) -> Option<&Row> {
        self.rows.last()
    }

    /// `schema.table` as reported by the source, for log messages.
    pub fn source_table(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }
}

/// Raw SQL text from statement-based (or mixed) replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatement {
    #[serde(alias = "query")]
    pub sql: String,
    #[serde(default)]
    pub schema_name: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ReplicationPosition>,
}

impl RawStatement {
    pub fn new(sql: impl Into<String>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            schema_name: schema.into(),
            table_name: table.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: ReplicationPosition) -> Self {
        self.position = Some(position);
        self
    }
}

/// A message from the upstream dispatcher to a sink connector.
///
/// In JSON form the variant is selected by a `kind` field:
///
/// ```json
/// {"kind": "row", "event_type": "insert", "schema_name": "db", "table_name": "t", "rows": [{"id": 1}]}
/// {"kind": "query", "sql": "ALTER TABLE t ADD COLUMN c INT", "schema_name": "db"}
/// {"kind": "commit"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceMessage {
    /// Row-level change to buffer.
    Row(ChangeEvent),
    /// Raw SQL text to classify.
    Query(RawStatement),
    /// Explicit commit signal.
    Commit,
    /// Event the dispatcher decided to skip.
    Skip(ChangeEvent),
}

impl SourceMessage {
    pub fn position(&self) -> Option<&ReplicationPosition> {
        match self {
            Self::Row(event) | Self::Skip(event) => event.position.as_ref(),
            Self::Query(statement) => statement.position.as_ref(),
            Self::Commit => None,
        }
    }
}
