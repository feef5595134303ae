//! Declared SQL types for item fields and bound parameters.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The declared type of a field or parameter.
///
/// Drives two decisions: whether a key value is still at its type's default
/// (Save resolution), and which zero value to hand the dialect when binding a
/// typed null so that storage type and size can be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Double,
    Text,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    /// Database cursor reference (PostgreSQL/Oracle style refcursor)
    RefCursor,
}

impl SqlType {
    /// The zero/default value for this type.
    ///
    /// Numbers are zero, text is empty, UUIDs are nil, dates are the Unix epoch.
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::SmallInt => Value::SmallInt(0),
            Self::Int => Value::Int(0),
            Self::BigInt => Value::BigInt(0),
            Self::Double => Value::Double(0.0),
            Self::Text => Value::Text(String::new()),
            Self::Bytes => Value::Bytes(Vec::new()),
            Self::Uuid => Value::Uuid(uuid::Uuid::nil()),
            Self::Date => Value::Date(chrono::NaiveDate::default()),
            Self::Time => Value::Time(chrono::NaiveTime::default()),
            Self::Timestamp => Value::Timestamp(chrono::NaiveDateTime::default()),
            Self::TimestampTz => Value::TimestampTz(chrono::DateTime::<chrono::Utc>::default()),
            Self::Json => Value::Json(serde_json::Value::Null),
            Self::RefCursor => Value::Null,
        }
    }

    /// Storage size a driver would infer for a value of this type, if fixed.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool => Some(1),
            Self::SmallInt => Some(2),
            Self::Int => Some(4),
            Self::BigInt | Self::Double => Some(8),
            Self::Uuid => Some(16),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_their_type() {
        for ty in [
            SqlType::Bool,
            SqlType::SmallInt,
            SqlType::Int,
            SqlType::BigInt,
            SqlType::Double,
            SqlType::Text,
            SqlType::Bytes,
            SqlType::Uuid,
            SqlType::Date,
            SqlType::Time,
            SqlType::Timestamp,
            SqlType::TimestampTz,
            SqlType::Json,
        ] {
            assert_eq!(ty.default_value().sql_type(), Some(ty), "{ty:?}");
        }
    }

    #[test]
    fn refcursor_default_is_null() {
        assert!(SqlType::RefCursor.default_value().is_null());
    }
}
