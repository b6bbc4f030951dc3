//! Value normalization: `RowValue` → destination-safe `DestinationValue`.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::values::RowValue;

/// A value that every destination driver can bind as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationValue {
    Null,
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl DestinationValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Display for DestinationValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Timestamp(ts) => write!(f, "'{}'", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
            Self::Date(d) => write!(f, "'{}'", d.format("%Y-%m-%d")),
        }
    }
}

/// Map one column value to its destination representation.
///
/// Scalars and temporal values pass through, bytes are decoded as text,
/// decimals keep their canonical string form, composites become JSON text and
/// UUIDs use their display form. Only JSON serialization can fail.
pub fn normalize(value: &RowValue) -> Result<DestinationValue> {
    Ok(match value {
        RowValue::Null => DestinationValue::Null,
        RowValue::Text(s) => DestinationValue::Text(s.clone()),
        RowValue::Int(i) => DestinationValue::Int(*i),
        RowValue::UInt(u) => DestinationValue::UInt(*u),
        RowValue::Float(f) => DestinationValue::Float(*f),
        RowValue::Bool(b) => DestinationValue::Bool(*b),
        RowValue::Bytes(b) => DestinationValue::Text(String::from_utf8_lossy(b).into_owned()),
        RowValue::Decimal(d) => DestinationValue::Text(d.clone()),
        RowValue::Timestamp(ts) => DestinationValue::Timestamp(*ts),
        RowValue::Date(d) => DestinationValue::Date(*d),
        RowValue::Uuid(u) => DestinationValue::Text(u.to_string()),
        RowValue::Array(_) | RowValue::Object(_) => {
            DestinationValue::Text(serde_json::to_string(value)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use uuid::Uuid;

    #[test]
    fn test_null() {
        assert_eq!(normalize(&RowValue::Null).unwrap(), DestinationValue::Null);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(
            normalize(&RowValue::Text("test".into())).unwrap(),
            DestinationValue::Text("test".into())
        );
        assert_eq!(normalize(&RowValue::Int(123)).unwrap(), DestinationValue::Int(123));
        assert_eq!(
            normalize(&RowValue::UInt(u64::MAX)).unwrap(),
            DestinationValue::UInt(u64::MAX)
        );
        assert_eq!(
            normalize(&RowValue::Float(123.456)).unwrap(),
            DestinationValue::Float(123.456)
        );
        assert_eq!(normalize(&RowValue::Bool(true)).unwrap(), DestinationValue::Bool(true));
    }

    #[test]
    fn test_bytes_become_text() {
        assert_eq!(
            normalize(&RowValue::Bytes(b"test".to_vec())).unwrap(),
            DestinationValue::Text("test".into())
        );
    }

    #[test]
    fn test_decimal_keeps_string_form() {
        assert_eq!(
            normalize(&RowValue::Decimal("123.456".into())).unwrap(),
            DestinationValue::Text("123.456".into())
        );
    }

    #[test]
    fn test_temporal_pass_through() {
        let now = Utc::now();
        assert_eq!(
            normalize(&RowValue::Timestamp(now)).unwrap(),
            DestinationValue::Timestamp(now)
        );
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert_eq!(normalize(&RowValue::Date(day)).unwrap(), DestinationValue::Date(day));
    }

    #[test]
    fn test_map_becomes_json() {
        let value = RowValue::Object(IndexMap::from([(
            "key".to_string(),
            RowValue::Text("value".into()),
        )]));
        let DestinationValue::Text(json) = normalize(&value).unwrap() else {
            panic!("expected text");
        };
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["key"], "value");
    }

    #[test]
    fn test_slice_becomes_json() {
        let value = RowValue::Array(vec![RowValue::Int(1), RowValue::Int(2), RowValue::Int(3)]);
        assert_eq!(
            normalize(&value).unwrap(),
            DestinationValue::Text("[1,2,3]".into())
        );
    }

    #[test]
    fn test_structured_record_becomes_json() {
        let value = RowValue::Object(IndexMap::from([(
            "field".to_string(),
            RowValue::Text("hello".into()),
        )]));
        assert_eq!(
            normalize(&value).unwrap(),
            DestinationValue::Text(r#"{"field":"hello"}"#.into())
        );
    }

    #[test]
    fn test_uuid_uses_display_form() {
        let id = Uuid::new_v4();
        assert_eq!(
            normalize(&RowValue::Uuid(id)).unwrap(),
            DestinationValue::Text(id.to_string())
        );
    }
}
