//! Row values as delivered by the upstream source.
//!
//! The upstream source hands over one dynamically-typed value per column.
//! `RowValue` closes that set so every consumer can match on it exhaustively.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::SinkError;

/// One row snapshot: column name to value, in the order the source reported them.
pub type Row = IndexMap<String, RowValue>;

/// A single column value as reported by the upstream source.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    /// SQL NULL
    Null,

    /// Character data
    Text(String),

    /// Any signed integer width
    Int(i64),

    /// Any unsigned integer width
    UInt(u64),

    /// Any floating point width
    Float(f64),

    /// Boolean value
    Bool(bool),

    /// Raw bytes (binary and non-UTF-8 aware string columns)
    Bytes(Vec<u8>),

    /// Arbitrary-precision numeric kept in its textual form
    Decimal(String),

    /// Date/time with timezone
    Timestamp(DateTime<Utc>),

    /// Calendar date
    Date(NaiveDate),

    /// UUID value
    Uuid(Uuid),

    /// Ordered sequence of values (JSON arrays, SET columns, ...)
    Array(Vec<RowValue>),

    /// Nested structure (JSON objects, structured records)
    Object(IndexMap<String, RowValue>),
}

impl RowValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Build a value from plain JSON.
    ///
    /// JSON has no notation for bytes, decimals or temporal values, so a
    /// single-key object whose key starts with `$` is read as a typed value:
    ///
    /// | key | payload |
    /// |---|---|
    /// | `$bytes` | base64 string |
    /// | `$decimal` | numeric string |
    /// | `$timestamp` | RFC 3339 string |
    /// | `$date` | `YYYY-MM-DD` string |
    /// | `$uuid` | hyphenated UUID string |
    ///
    /// Any other object is a nested [`RowValue::Object`].
    pub fn from_json(value: serde_json::Value) -> Result<Self, SinkError> {
        use serde_json::Value as Json;

        Ok(match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    let f = n
                        .as_f64()
                        .ok_or_else(|| SinkError::InvalidValue(format!("number {n}")))?;
                    Self::Float(f)
                }
            }
            Json::String(s) => Self::Text(s),
            Json::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, Json::String(payload))) = map.iter().next() {
                        if let Some(typed) = Self::from_tagged(key, payload)? {
                            return Ok(typed);
                        }
                    }
                }
                let mut object = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key, Self::from_json(value)?);
                }
                Self::Object(object)
            }
        })
    }

    fn from_tagged(key: &str, payload: &str) -> Result<Option<Self>, SinkError> {
        let value = match key {
            "$bytes" => Self::Bytes(
                BASE64
                    .decode(payload)
                    .map_err(|e| SinkError::InvalidValue(format!("$bytes: {e}")))?,
            ),
            "$decimal" => {
                let trimmed = payload.trim();
                if trimmed.parse::<f64>().is_err() {
                    return Err(SinkError::InvalidValue(format!(
                        "$decimal: '{payload}' is not numeric"
                    )));
                }
                Self::Decimal(trimmed.to_string())
            }
            "$timestamp" => Self::Timestamp(
                DateTime::parse_from_rfc3339(payload)
                    .map_err(|e| SinkError::InvalidValue(format!("$timestamp: {e}")))?
                    .with_timezone(&Utc),
            ),
            "$date" => Self::Date(
                NaiveDate::parse_from_str(payload, "%Y-%m-%d")
                    .map_err(|e| SinkError::InvalidValue(format!("$date: {e}")))?,
            ),
            "$uuid" => Self::Uuid(
                Uuid::parse_str(payload)
                    .map_err(|e| SinkError::InvalidValue(format!("$uuid: {e}")))?,
            ),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// Serializes to canonical JSON: temporal values as ISO 8601 strings, bytes as
/// (lossy) UTF-8 text, decimals as strings.
impl Serialize for RowValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Self::Decimal(d) => serializer.serialize_str(d),
            Self::Timestamp(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Self::Uuid(u) => serializer.serialize_str(&u.to_string()),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for RowValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(json).map_err(D::Error::custom)
    }
}

impl From<&str> for RowValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RowValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i32> for RowValue {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<i64> for RowValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for RowValue {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for RowValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for RowValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<u8>> for RowValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<DateTime<Utc>> for RowValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl<T: Into<RowValue>> From<Option<T>> for RowValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```rust
/// use sync_core::{row, RowValue};
///
/// let r = row! { "id" => 1, "name" => "foo" };
/// assert_eq!(r["id"], RowValue::Int(1));
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::Row::new() };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $(row.insert(($column).to_string(), $crate::RowValue::from($value));)+
        row
    }};
}
