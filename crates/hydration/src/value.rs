//! Column Values - Scalar values carried by hydration rows
//!
//! `ColumnValue` mirrors the set of scalars the execution layer can hand
//! back for one column, with JSON conversion for typed access and a loose
//! equality used when matching inheritance discriminators.

use serde_json::Value as JsonValue;

/// A single column value inside a [`Row`](crate::row::Row)
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    DateTime(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    Json(JsonValue),
    Array(Vec<ColumnValue>),
}

impl ColumnValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// JSON form used for typed access through serde
    pub fn to_json(&self) -> JsonValue {
        match self {
            ColumnValue::Null => JsonValue::Null,
            ColumnValue::Bool(b) => JsonValue::from(*b),
            ColumnValue::Int32(i) => JsonValue::from(*i),
            ColumnValue::Int64(i) => JsonValue::from(*i),
            // Non-finite floats have no JSON form and become null
            ColumnValue::Float32(f) => JsonValue::from(f64::from(*f)),
            ColumnValue::Float64(f) => JsonValue::from(*f),
            ColumnValue::String(s) => JsonValue::from(s.as_str()),
            ColumnValue::Bytes(bytes) => JsonValue::from(bytes.clone()),
            ColumnValue::Uuid(id) => JsonValue::from(id.to_string()),
            ColumnValue::DateTime(at) => JsonValue::from(at.to_rfc3339()),
            ColumnValue::Date(date) => JsonValue::from(date.to_string()),
            ColumnValue::Time(time) => JsonValue::from(time.to_string()),
            ColumnValue::Json(json) => json.clone(),
            ColumnValue::Array(items) => items.iter().map(ColumnValue::to_json).collect(),
        }
    }

    /// Column value for a JSON scalar or structure.
    ///
    /// Integers that fit in 32 bits become `Int32`. Strings stay strings; no
    /// attempt is made to sniff UUIDs or timestamps, so discriminator values
    /// round-trip unchanged. Objects are kept whole as `Json`.
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => ColumnValue::Null,
            JsonValue::Bool(b) => ColumnValue::Bool(b),
            JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => i32::try_from(i)
                    .map(ColumnValue::Int32)
                    .unwrap_or(ColumnValue::Int64(i)),
                (None, Some(f)) => ColumnValue::Float64(f),
                (None, None) => ColumnValue::Null,
            },
            JsonValue::String(s) => ColumnValue::String(s),
            JsonValue::Array(items) => {
                ColumnValue::Array(items.into_iter().map(ColumnValue::from_json).collect())
            }
            object @ JsonValue::Object(_) => ColumnValue::Json(object),
        }
    }

    /// Integer view of the value, if it has an exact one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Bool(b) => Some(i64::from(*b)),
            ColumnValue::Int32(i) => Some(i64::from(*i)),
            ColumnValue::Int64(i) => Some(*i),
            ColumnValue::Float32(f) => float_to_i64(f64::from(*f)),
            ColumnValue::Float64(f) => float_to_i64(*f),
            ColumnValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating point view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ColumnValue::Int32(i) => Some(f64::from(*i)),
            ColumnValue::Int64(i) => Some(*i as f64),
            ColumnValue::Float32(f) => Some(f64::from(*f)),
            ColumnValue::Float64(f) => Some(*f),
            ColumnValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view of the value, for string columns only
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn is_numeric_like(&self) -> bool {
        match self {
            ColumnValue::Bool(_)
            | ColumnValue::Int32(_)
            | ColumnValue::Int64(_)
            | ColumnValue::Float32(_)
            | ColumnValue::Float64(_) => true,
            ColumnValue::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        }
    }

    /// Loose equality used for discriminator matching.
    ///
    /// Two strings compare exactly. Numbers compare by value across widths,
    /// and a numeric string equals the number it parses to. A UUID equals its
    /// string form. Everything else compares structurally.
    pub fn loosely_equals(&self, other: &ColumnValue) -> bool {
        match (self, other) {
            (ColumnValue::String(a), ColumnValue::String(b)) => a == b,
            (ColumnValue::Uuid(u), ColumnValue::String(s))
            | (ColumnValue::String(s), ColumnValue::Uuid(u)) => uuid::Uuid::parse_str(s.trim())
                .map(|parsed| parsed == *u)
                .unwrap_or(false),
            _ if self.is_numeric_like() && other.is_numeric_like() => {
                match (self.as_i64(), other.as_i64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => match (self.as_f64(), other.as_f64()) {
                        (Some(a), Some(b)) => a == b,
                        _ => false,
                    },
                }
            }
            _ => self == other,
        }
    }
}

/// Exact integer for a whole float inside the i64 range; `as` would saturate
fn float_to_i64(f: f64) -> Option<i64> {
    const I64_BOUND: f64 = 9.2e18;
    if f.fract() == 0.0 && f.abs() < I64_BOUND {
        Some(f as i64)
    } else {
        None
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Int32(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Int64(value)
    }
}

impl From<f32> for ColumnValue {
    fn from(value: f32) -> Self {
        ColumnValue::Float32(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Float64(value)
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::String(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for ColumnValue {
    fn from(value: Vec<u8>) -> Self {
        ColumnValue::Bytes(value)
    }
}

impl From<uuid::Uuid> for ColumnValue {
    fn from(value: uuid::Uuid) -> Self {
        ColumnValue::Uuid(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for ColumnValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        ColumnValue::DateTime(value)
    }
}

impl From<chrono::NaiveDate> for ColumnValue {
    fn from(value: chrono::NaiveDate) -> Self {
        ColumnValue::Date(value)
    }
}

impl From<chrono::NaiveTime> for ColumnValue {
    fn from(value: chrono::NaiveTime) -> Self {
        ColumnValue::Time(value)
    }
}

impl From<JsonValue> for ColumnValue {
    fn from(value: JsonValue) -> Self {
        ColumnValue::from_json(value)
    }
}

impl<T> From<Option<T>> for ColumnValue
where
    T: Into<ColumnValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ColumnValue::Null,
        }
    }
}
