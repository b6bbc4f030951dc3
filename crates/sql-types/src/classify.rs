//! Shallow classification of raw SQL from statement-based replication.
//!
//! Row changes made by DML statements also arrive as row events, so only
//! schema changes are worth forwarding. The classifier looks at the leading
//! keyword(s) and nothing else.

/// What a raw statement is, as far as the sink cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Schema change: `ALTER`, `RENAME`, `DROP`, `TRUNCATE`, `CREATE`.
    Ddl,
    /// Transaction framing: exactly `BEGIN` or `COMMIT`.
    TransactionControl,
    /// Everything else, including empty and unrecognized text.
    NonDdl,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddl => "ddl",
            Self::TransactionControl => "transaction_control",
            Self::NonDdl => "non_ddl",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const DDL_KEYWORDS: &[&str] = &["ALTER", "RENAME", "DROP", "TRUNCATE", "CREATE"];
const ROW_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE", "REPLACE", "SAVEPOINT"];

/// Classify raw SQL text. Never fails: unrecognized text is `NonDdl`.
pub fn classify(sql: &str) -> StatementKind {
    let body = statement_body(sql);
    if body.eq_ignore_ascii_case("BEGIN") || body.eq_ignore_ascii_case("COMMIT") {
        return StatementKind::TransactionControl;
    }
    match leading_keywords(body).first() {
        Some(first) if DDL_KEYWORDS.iter().any(|k| first.eq_ignore_ascii_case(k)) => {
            StatementKind::Ddl
        }
        _ => StatementKind::NonDdl,
    }
}

/// Whether the text is a recognized DML or savepoint statement.
///
/// Narrower than `classify(..) == NonDdl`: empty and unrecognized text is
/// `NonDdl` but not row-shaped.
pub fn is_row_shaped(sql: &str) -> bool {
    let keywords = leading_keywords(statement_body(sql));
    match keywords.as_slice() {
        [first, ..] if ROW_KEYWORDS.iter().any(|k| first.eq_ignore_ascii_case(k)) => true,
        [first, second, ..] if first.eq_ignore_ascii_case("RELEASE") => {
            second.eq_ignore_ascii_case("SAVEPOINT")
        }
        [first, second, ..] if first.eq_ignore_ascii_case("ROLLBACK") => {
            second.eq_ignore_ascii_case("TO")
        }
        _ => false,
    }
}

/// The statement text with surrounding whitespace, leading comments and one
/// trailing `;` removed.
pub(crate) fn statement_body(sql: &str) -> &str {
    let mut rest = sql.trim();
    loop {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(end) => after[end + 2..].trim_start(),
                None => "",
            };
        } else if rest.starts_with("-- ") || rest == "--" || rest.starts_with('#') {
            rest = match rest.find('\n') {
                Some(end) => rest[end + 1..].trim_start(),
                None => "",
            };
        } else {
            break;
        }
    }
    rest.strip_suffix(';').unwrap_or(rest).trim_end()
}

fn leading_keywords(body: &str) -> Vec<&str> {
    body.split_whitespace().take(2).collect()
}
