//! DDL generation and translation.
//!
//! Two directions:
//!
//! - [`ToDdl`] infers column types from a sample row and renders the
//!   `CREATE TABLE IF NOT EXISTS` used to auto-create destination tables.
//! - [`translate_ddl`] rewrites the table names in forwarded schema-change
//!   statements to their resolved, dialect-quoted destination names.

use std::ops::Range;

use sync_core::{Row, RowValue};

use crate::classify::statement_body;
use crate::dialect::SqlDialect;
use crate::identifier::{identifier_len, is_ident_byte, IdentifierResolver, TableRef};

/// Trait for generating DDL from sample values.
pub trait ToDdl {
    /// Column type for a value of this kind. Key columns get a bounded type
    /// where the unbounded one cannot be indexed.
    fn to_ddl(&self, value: &RowValue, is_key: bool) -> String;

    /// `CREATE TABLE IF NOT EXISTS` with one column per sample entry, in
    /// sample order. Primary-key columns absent from the sample are ignored.
    fn create_table_if_not_exists(
        &self,
        table: &TableRef,
        sample: &Row,
        primary_keys: &[String],
    ) -> String;
}

impl ToDdl for SqlDialect {
    fn to_ddl(&self, value: &RowValue, is_key: bool) -> String {
        match self {
            SqlDialect::MySql => match value {
                RowValue::Int(_) => "BIGINT",
                RowValue::UInt(_) => "BIGINT UNSIGNED",
                RowValue::Float(_) => "DOUBLE",
                RowValue::Bool(_) => "TINYINT(1)",
                RowValue::Decimal(_) => "DECIMAL(65,30)",
                RowValue::Timestamp(_) => "DATETIME(6)",
                RowValue::Date(_) => "DATE",
                RowValue::Uuid(_) => "CHAR(36)",
                _ if is_key => "VARCHAR(255)",
                RowValue::Array(_) | RowValue::Object(_) => "JSON",
                RowValue::Null | RowValue::Text(_) | RowValue::Bytes(_) => "TEXT",
            },
            SqlDialect::Ansi => match value {
                RowValue::Int(_) => "BIGINT",
                RowValue::UInt(_) => "DECIMAL(20,0)",
                RowValue::Float(_) => "DOUBLE",
                RowValue::Bool(_) => "BOOLEAN",
                RowValue::Decimal(_) => "DECIMAL(38,10)",
                RowValue::Timestamp(_) => "TIMESTAMP",
                RowValue::Date(_) => "DATE",
                RowValue::Uuid(_) => "VARCHAR(36)",
                _ if is_key => "VARCHAR(255)",
                RowValue::Array(_) | RowValue::Object(_) => "NCLOB",
                RowValue::Null | RowValue::Text(_) | RowValue::Bytes(_) => "NVARCHAR(5000)",
            },
        }
        .to_string()
    }

    fn create_table_if_not_exists(
        &self,
        table: &TableRef,
        sample: &Row,
        primary_keys: &[String],
    ) -> String {
        let mut defs: Vec<String> = sample
            .iter()
            .map(|(column, value)| {
                let is_key = primary_keys.contains(column);
                let null_clause = if is_key { " NOT NULL" } else { "" };
                format!(
                    "{} {}{null_clause}",
                    self.quote_ident(column),
                    self.to_ddl(value, is_key)
                )
            })
            .collect();

        let keys: Vec<String> = primary_keys
            .iter()
            .filter(|key| sample.contains_key(key.as_str()))
            .map(|key| self.quote_ident(key))
            .collect();
        if !keys.is_empty() {
            defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.qualified(table),
            defs.join(", ")
        )
    }
}

/// A forwarded DDL statement with its table names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedDdl {
    /// Statement text to execute on the destination.
    pub sql: String,
    /// Every destination table the statement touches, in statement order.
    pub tables: Vec<TableRef>,
}

/// Rewrite the table names in a schema-change statement.
///
/// Recognized forms:
///
/// ```text
/// ALTER [ONLINE] [IGNORE] TABLE t ...
/// CREATE [TEMPORARY] TABLE [IF NOT EXISTS] t ...
/// DROP [TEMPORARY] TABLE [IF EXISTS] t [, t ...] ...
/// TRUNCATE [TABLE] t
/// RENAME TABLE a TO b [, c TO d ...]
/// ```
///
/// Each table name is resolved with `default_schema` as fallback and
/// replaced by its quoted `schema.table`; the rest of the text is kept.
/// Returns `None` for statements that are not about a table, such as
/// `CREATE DATABASE` or `CREATE INDEX`.
pub fn translate_ddl(
    dialect: SqlDialect,
    resolver: &IdentifierResolver,
    sql: &str,
    default_schema: &str,
) -> Option<TranslatedDdl> {
    let body = statement_body(sql);
    let spans = table_spans(body)?;

    let mut out = String::with_capacity(body.len() + 16);
    let mut tables = Vec::with_capacity(spans.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&body[last..span.start]);
        let table = resolver.resolve(&body[span.clone()], default_schema);
        out.push_str(&dialect.qualified(&table));
        if !tables.contains(&table) {
            tables.push(table);
        }
        last = span.end;
    }
    out.push_str(&body[last..]);

    Some(TranslatedDdl { sql: out, tables })
}

fn table_spans(body: &str) -> Option<Vec<Range<usize>>> {
    let mut cursor = Cursor::new(body);

    if cursor.keyword("ALTER") {
        cursor.keyword("ONLINE");
        cursor.keyword("IGNORE");
        cursor.require("TABLE")?;
        return Some(vec![cursor.identifier()?]);
    }

    if cursor.keyword("CREATE") {
        cursor.keyword("TEMPORARY");
        cursor.require("TABLE")?;
        cursor.keywords(&["IF", "NOT", "EXISTS"]);
        return Some(vec![cursor.identifier()?]);
    }

    if cursor.keyword("DROP") {
        cursor.keyword("TEMPORARY");
        cursor.require("TABLE")?;
        cursor.keywords(&["IF", "EXISTS"]);
        let mut spans = vec![cursor.identifier()?];
        while cursor.punct(',') {
            spans.push(cursor.identifier()?);
        }
        return Some(spans);
    }

    if cursor.keyword("TRUNCATE") {
        cursor.keyword("TABLE");
        return Some(vec![cursor.identifier()?]);
    }

    if cursor.keyword("RENAME") {
        cursor.require("TABLE")?;
        let mut spans = Vec::new();
        loop {
            spans.push(cursor.identifier()?);
            cursor.require("TO")?;
            spans.push(cursor.identifier()?);
            if !cursor.punct(',') {
                return Some(spans);
            }
        }
    }

    None
}

/// Keyword/identifier scanner over a single statement.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consume `kw` (case-insensitive, whole word) if it comes next.
    fn keyword(&mut self, kw: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        let matched = rest
            .get(..kw.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(kw))
            && !rest
                .as_bytes()
                .get(kw.len())
                .is_some_and(|b| is_ident_byte(*b));
        if matched {
            self.pos += kw.len();
        }
        matched
    }

    fn require(&mut self, kw: &str) -> Option<()> {
        self.keyword(kw).then_some(())
    }

    /// Consume the whole keyword sequence, or nothing.
    fn keywords(&mut self, kws: &[&str]) -> bool {
        let start = self.pos;
        if kws.iter().all(|kw| self.keyword(kw)) {
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn identifier(&mut self) -> Option<Range<usize>> {
        self.skip_ws();
        let len = identifier_len(self.rest());
        if len == 0 {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some(start..self.pos)
    }

    fn punct(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }
}
