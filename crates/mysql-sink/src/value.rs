//! Conversion: DestinationValue → mysql_async::Value

use chrono::{Datelike, Timelike};
use mysql_async::Value;
use sync_core::DestinationValue;

/// MySQL value wrapper for parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct MySQLValue(pub Value);

impl MySQLValue {
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<&DestinationValue> for MySQLValue {
    fn from(value: &DestinationValue) -> Self {
        match value {
            DestinationValue::Null => MySQLValue(Value::NULL),
            DestinationValue::Text(s) => MySQLValue(Value::Bytes(s.clone().into_bytes())),
            DestinationValue::Int(i) => MySQLValue(Value::Int(*i)),
            DestinationValue::UInt(u) => MySQLValue(Value::UInt(*u)),
            DestinationValue::Float(f) => MySQLValue(Value::Double(*f)),
            // TINYINT(1)
            DestinationValue::Bool(b) => MySQLValue(Value::Int(i64::from(*b))),
            // DATETIME(6), stored in UTC
            DestinationValue::Timestamp(dt) => MySQLValue(Value::Date(
                dt.year() as u16,
                dt.month() as u8,
                dt.day() as u8,
                dt.hour() as u8,
                dt.minute() as u8,
                dt.second() as u8,
                dt.timestamp_subsec_micros(),
            )),
            DestinationValue::Date(d) => MySQLValue(Value::Date(
                d.year() as u16,
                d.month() as u8,
                d.day() as u8,
                0,
                0,
                0,
                0,
            )),
        }
    }
}

/// Convert a statement's parameters for `exec_drop`.
pub(crate) fn to_params(params: &[DestinationValue]) -> mysql_async::Params {
    if params.is_empty() {
        mysql_async::Params::Empty
    } else {
        mysql_async::Params::Positional(
            params
                .iter()
                .map(|p| MySQLValue::from(p).into_inner())
                .collect(),
        )
    }
}
