//! Destination table resolution.
//!
//! Names reach the sink in two shapes: the separate schema/table strings of a
//! change event, and qualified names embedded in raw SQL (`t`, `db.t`,
//! `` `db`.`t` ``). Both are resolved against the connector overrides here.

/// A resolved destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.schema.is_empty() {
            f.write_str(&self.table)
        } else {
            write!(f, "{}.{}", self.schema, self.table)
        }
    }
}

/// Resolves destination tables, applying connector-level overrides.
///
/// Precedence for the schema: override, then the schema parsed from the name,
/// then the caller's default. The table override, when set, always wins over
/// the parsed table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierResolver {
    schema_override: Option<String>,
    table_override: Option<String>,
}

impl IdentifierResolver {
    /// Empty override strings mean "no override".
    pub fn new(schema_override: Option<String>, table_override: Option<String>) -> Self {
        Self {
            schema_override: schema_override.filter(|s| !s.is_empty()),
            table_override: table_override.filter(|t| !t.is_empty()),
        }
    }

    /// Resolve a name taken from SQL text.
    pub fn resolve(&self, qualified: &str, default_schema: &str) -> TableRef {
        let (parsed_schema, parsed_table) = parse_qualified(qualified);
        let schema = self
            .schema_override
            .clone()
            .or(parsed_schema)
            .unwrap_or_else(|| unquote(default_schema));
        let table = self.table_override.clone().unwrap_or(parsed_table);
        TableRef { schema, table }
    }

    /// Resolve the separate schema and table names reported with an event.
    pub fn resolve_names(&self, schema_name: &str, table_name: &str) -> TableRef {
        let schema = self
            .schema_override
            .clone()
            .unwrap_or_else(|| unquote(schema_name));
        let table = self
            .table_override
            .clone()
            .unwrap_or_else(|| unquote(table_name));
        TableRef { schema, table }
    }
}

/// Split `table`, `schema.table` or their quoted forms into `(schema, table)`.
///
/// Each component may be wrapped in back-quotes or double quotes; a doubled
/// quote inside a quoted component is a literal quote. Dots inside quotes do
/// not separate components. With more than two components the last two are
/// used.
pub fn parse_qualified(name: &str) -> (Option<String>, String) {
    let mut parts: Vec<String> = split_components(name).into_iter().map(unquote).collect();
    let table = parts.pop().unwrap_or_default();
    let schema = parts.pop().filter(|s| !s.is_empty());
    (schema, table)
}

fn split_components(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    for (i, c) in name.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '`' | '"') => quote = Some(c),
            (None, '.') => {
                parts.push(&name[start..i]);
                start = i + 1;
            }
            (None, _) => {}
        }
    }
    parts.push(&name[start..]);
    parts
}

/// Strip one level of quoting from an identifier component.
///
/// A doubled quote ends and immediately reopens the quoted run in
/// [`split_components`], so it arrives here intact and collapses to one.
fn unquote(component: &str) -> String {
    let trimmed = component.trim();
    for q in ['`', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(q) && trimmed.ends_with(q) {
            let inner = &trimmed[1..trimmed.len() - 1];
            let doubled: String = [q, q].iter().collect();
            return inner.replace(&doubled, &q.to_string());
        }
    }
    trimmed.to_string()
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Byte length of the (possibly qualified, possibly quoted) identifier at the
/// start of `s`, or 0 if `s` does not start with one.
pub(crate) fn identifier_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut i = 0;
    loop {
        match bytes.get(i) {
            Some(&q) if q == b'`' || q == b'"' => {
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return end,
                        Some(&c) if c == q => {
                            if bytes.get(i + 1) == Some(&q) {
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            Some(&c) if is_ident_byte(c) => {
                while bytes.get(i).is_some_and(|c| is_ident_byte(*c)) {
                    i += 1;
                }
            }
            _ => return end,
        }
        end = i;
        if bytes.get(i) == Some(&b'.') {
            i += 1;
        } else {
            return end;
        }
    }
}
