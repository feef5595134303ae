//! Dynamic values carried by items and bound parameters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::types::SqlType;

/// A dynamically typed SQL value.
///
/// Besides ordinary data this carries two sentinels that never reach the
/// database as literal values: [`Value::RowCount`] marks an output slot to be
/// filled with the affected-row count, and [`Value::Cursor`] marks a cursor
/// reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    /// Populate this output slot with the affected-row count after execution.
    RowCount,
    /// Cursor reference; the name is only needed when passing a cursor by value.
    Cursor(Option<String>),
}

impl Value {
    /// The runtime type of this value (`None` for null and sentinels).
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Self::Null | Self::RowCount => None,
            Self::Bool(_) => Some(SqlType::Bool),
            Self::SmallInt(_) => Some(SqlType::SmallInt),
            Self::Int(_) => Some(SqlType::Int),
            Self::BigInt(_) => Some(SqlType::BigInt),
            Self::Double(_) => Some(SqlType::Double),
            Self::Text(_) => Some(SqlType::Text),
            Self::Bytes(_) => Some(SqlType::Bytes),
            Self::Uuid(_) => Some(SqlType::Uuid),
            Self::Date(_) => Some(SqlType::Date),
            Self::Time(_) => Some(SqlType::Time),
            Self::Timestamp(_) => Some(SqlType::Timestamp),
            Self::TimestampTz(_) => Some(SqlType::TimestampTz),
            Self::Json(_) => Some(SqlType::Json),
            Self::Cursor(_) => Some(SqlType::RefCursor),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for [`Value::RowCount`] and [`Value::Cursor`].
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::RowCount | Self::Cursor(_))
    }

    /// Whether this value equals the default value of `declared`.
    ///
    /// With no declared type the value's own runtime type is used. Null is
    /// always considered default.
    pub fn is_default_for(&self, declared: Option<SqlType>) -> bool {
        if self.is_null() {
            return true;
        }
        match declared.or_else(|| self.sql_type()) {
            Some(ty) => *self == ty.default_value(),
            None => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of any integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::BigInt(v) => Some(*v),
            Self::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Render the value as plain text, as introspection rows are commonly read.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::RowCount => None,
            Self::Bool(v) => Some(v.to_string()),
            Self::SmallInt(v) => Some(v.to_string()),
            Self::Int(v) => Some(v.to_string()),
            Self::BigInt(v) => Some(v.to_string()),
            Self::Double(v) => Some(v.to_string()),
            Self::Text(v) => Some(v.clone()),
            Self::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
            Self::Uuid(v) => Some(v.to_string()),
            Self::Date(v) => Some(v.to_string()),
            Self::Time(v) => Some(v.to_string()),
            Self::Timestamp(v) => Some(v.to_string()),
            Self::TimestampTz(v) => Some(v.to_rfc3339()),
            Self::Json(v) => Some(v.to_string()),
            Self::Cursor(v) => v.clone(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::BigInt(i),
                (None, Some(f)) => Self::Double(f),
                // No lossless scalar form; keep the number as JSON.
                (None, None) => Self::Json(serde_json::Value::Number(n)),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Json(other),
        }
    }
}

/// Convert a Rust value into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Convert a [`Value`] back into a Rust value (used for key write-back).
pub trait FromValue: Sized {
    fn from_value(value: Value, column: &str) -> OrmResult<Self>;
}

/// Declared SQL type of a Rust type.
pub trait SqlTyped {
    fn sql_type() -> SqlType;
}

fn mismatch(column: &str, expected: &str, got: &Value) -> OrmError {
    OrmError::conversion(column, format!("expected {expected}, got {got:?}"))
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident, $sql:ident;)*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl SqlTyped for $ty {
                fn sql_type() -> SqlType {
                    SqlType::$sql
                }
            }
        )*
    };
}

impl_value_conversions! {
    bool => Bool, Bool;
    i16 => SmallInt, SmallInt;
    i32 => Int, Int;
    i64 => BigInt, BigInt;
    f64 => Double, Double;
    String => Text, Text;
    Vec<u8> => Bytes, Bytes;
    uuid::Uuid => Uuid, Uuid;
    NaiveDate => Date, Date;
    NaiveTime => Time, Time;
    NaiveDateTime => Timestamp, Timestamp;
    DateTime<Utc> => TimestampTz, TimestampTz;
}

// `From<serde_json::Value>` is written by hand above so JSON scalars map to plain values.
impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl SqlTyped for serde_json::Value {
    fn sql_type() -> SqlType {
        SqlType::Json
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: SqlTyped> SqlTyped for Option<T> {
    fn sql_type() -> SqlType {
        T::sql_type()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, column).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => other
                .as_i64()
                .map(|i| i != 0)
                .ok_or_else(|| mismatch(column, "bool", &other)),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value, column: &str) -> OrmResult<Self> {
                    let wide = match &value {
                        Value::Text(s) => s.trim().parse::<i64>().ok(),
                        Value::Double(d) if d.fract() == 0.0 => Some(*d as i64),
                        other => other.as_i64(),
                    };
                    wide.and_then(|i| <$ty>::try_from(i).ok())
                        .ok_or_else(|| mismatch(column, stringify!($ty), &value))
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64);

impl FromValue for f64 {
    fn from_value(value: Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Double(d) => Ok(d),
            other => other
                .as_i64()
                .map(|i| i as f64)
                .ok_or_else(|| mismatch(column, "f64", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Err(mismatch(column, "String", &Value::Null)),
            other => other
                .to_text()
                .ok_or_else(|| mismatch(column, "String", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch(column, "bytes", &other)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(ref s) => {
                uuid::Uuid::parse_str(s).map_err(|_| mismatch(column, "uuid", &value))
            }
            other => Err(mismatch(column, "uuid", &other)),
        }
    }
}

macro_rules! impl_from_value_exact {
    ($($ty:ty => $variant:ident;)*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value, column: &str) -> OrmResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(column, stringify!($variant), &other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_exact! {
    NaiveDate => Date;
    NaiveTime => Time;
    NaiveDateTime => Timestamp;
    DateTime<Utc> => TimestampTz;
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value, _column: &str) -> OrmResult<Self> {
        Ok(match value {
            Value::Json(j) => j,
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Text(s) => serde_json::Value::String(s),
            other => match other.as_i64() {
                Some(i) => serde_json::Value::from(i),
                None => serde_json::Value::String(other.to_text().unwrap_or_default()),
            },
        })
    }
}
