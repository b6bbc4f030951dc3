//! SQL dialect selection.
//!
//! Provides the `SqlDialect` enum, which decides how identifiers are quoted
//! and which column types auto-created tables use.

use serde::{Deserialize, Serialize};

use crate::identifier::TableRef;

/// Destination SQL dialect.
///
/// Both dialects bind values as positional `?` parameters; they differ in
/// identifier quoting and in the DDL types used for auto-created tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// MySQL / MariaDB: back-quoted identifiers.
    #[default]
    MySql,
    /// ANSI quoting (HANA and friends): double-quoted identifiers.
    Ansi,
}

impl SqlDialect {
    /// Quote a single identifier, doubling any embedded quote character.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::Ansi => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Quote a resolved table as `schema.table`, or just `table` when no schema is known.
    pub fn qualified(&self, table: &TableRef) -> String {
        if table.schema.is_empty() {
            self.quote_ident(&table.table)
        } else {
            format!(
                "{}.{}",
                self.quote_ident(&table.schema),
                self.quote_ident(&table.table)
            )
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql => write!(f, "mysql"),
            Self::Ansi => write!(f, "ansi"),
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "ansi" | "hana" => Ok(Self::Ansi),
            _ => Err(anyhow::anyhow!(
                "Invalid SQL dialect: '{s}'. Expected 'mysql' or 'ansi'"
            )),
        }
    }
}
