//! Name/value adapter: one uniform view over the supported item representations.
//!
//! An item is one of a closed set of variants:
//!
//! - [`Item::Record`]: a typed struct implementing [`Record`] (usually via
//!   `#[derive(Record)]`)
//! - [`Item::Map`]: a [`TaggedMap`] of column name to [`Value`]
//! - [`Item::Values`]: raw positional values with no names
//!
//! Every variant produces the same ordered sequence of [`NameValueType`]
//! triples, so command building never needs to know which one it was given.

use serde::{Deserialize, Serialize};

use crate::error::OrmResult;
use crate::types::SqlType;
use crate::value::Value;

/// One field of an item: optional name, value and declared type.
///
/// `name == None` marks a positional (value-only) field.
#[derive(Debug, Clone, PartialEq)]
pub struct NameValueType {
    pub name: Option<String>,
    pub value: Value,
    pub declared_type: Option<SqlType>,
}

impl NameValueType {
    /// A named field with an explicit declared type.
    pub fn named(name: impl Into<String>, value: Value, declared_type: Option<SqlType>) -> Self {
        Self {
            name: Some(name.into()),
            value,
            declared_type,
        }
    }

    /// A positional field; its declared type is the value's runtime type.
    pub fn positional(value: Value) -> Self {
        let declared_type = value.sql_type();
        Self {
            name: None,
            value,
            declared_type,
        }
    }
}

/// A typed record that can expose its fields and accept a generated key.
///
/// Implemented by `#[derive(Record)]`.
pub trait Record {
    /// Field triples in declaration order.
    fn fields(&self) -> Vec<NameValueType>;

    /// Set the field mapped to `column` (case-insensitive).
    ///
    /// Returns `Ok(false)` if no such field exists.
    fn set_field(&mut self, column: &str, value: Value) -> OrmResult<bool>;
}

/// Static table information for a [`Record`] type.
pub trait RecordMeta {
    /// Table name, possibly owner-qualified.
    const TABLE: &'static str;
    /// Comma-separated primary key column list (empty for no key).
    const KEYS: &'static str;
    /// Field bound to the sole primary key, if there is exactly one.
    const KEY_MEMBER: Option<&'static str>;
    /// Sequence name or identity function override declared on the type.
    const SEQUENCE: Option<&'static str> = None;
}

/// Insertion-ordered map of column name to value, with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedMap {
    entries: Vec<(String, Value)>,
}

impl TaggedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace (matching names case-insensitively, keeping position).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|pos| &self.entries[pos].1)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.position(name).map(|pos| self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build from a JSON object; non-objects yield an empty map.
    pub fn from_json(json: serde_json::Value) -> Self {
        let mut map = Self::new();
        if let serde_json::Value::Object(obj) = json {
            for (k, v) in obj {
                map.insert(k, Value::from(v));
            }
        }
        map
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TaggedMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Read-only view of an item in any supported representation.
#[derive(Clone, Copy)]
pub enum Item<'a> {
    Record(&'a dyn Record),
    Map(&'a TaggedMap),
    Values(&'a [Value]),
}

impl<'a> Item<'a> {
    pub fn record(record: &'a dyn Record) -> Self {
        Self::Record(record)
    }

    pub fn map(map: &'a TaggedMap) -> Self {
        Self::Map(map)
    }

    pub fn values(values: &'a [Value]) -> Self {
        Self::Values(values)
    }

    /// The field triples, in stable order. Each call restarts the sequence.
    pub fn fields(&self) -> Vec<NameValueType> {
        match self {
            Self::Record(r) => r.fields(),
            Self::Map(m) => m
                .iter()
                .map(|(k, v)| NameValueType::named(k, v.clone(), v.sql_type()))
                .collect(),
            Self::Values(vs) => vs.iter().cloned().map(NameValueType::positional).collect(),
        }
    }

    /// `false` when the item carries values only (positional input).
    pub fn has_names(&self) -> bool {
        !matches!(self, Self::Values(_))
    }

    /// Copy the item into a fresh tagged map.
    ///
    /// Positional values get their ordinal as name.
    pub fn to_map(&self) -> TaggedMap {
        self.fields()
            .into_iter()
            .enumerate()
            .map(|(i, f)| (f.name.unwrap_or_else(|| i.to_string()), f.value))
            .collect()
    }
}

impl std::fmt::Debug for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(_) => f.debug_tuple("Record").field(&"<dyn Record>").finish(),
            Self::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Self::Values(v) => f.debug_tuple("Values").field(v).finish(),
        }
    }
}

impl<'a> From<&'a TaggedMap> for Item<'a> {
    fn from(map: &'a TaggedMap) -> Self {
        Self::Map(map)
    }
}

impl<'a> From<&'a [Value]> for Item<'a> {
    fn from(values: &'a [Value]) -> Self {
        Self::Values(values)
    }
}

impl<'a> From<&'a Vec<Value>> for Item<'a> {
    fn from(values: &'a Vec<Value>) -> Self {
        Self::Values(values.as_slice())
    }
}

/// Mutable view of an item, used to write a generated key back.
pub enum ItemMut<'a> {
    Record(&'a mut dyn Record),
    Map(&'a mut TaggedMap),
    Values(&'a [Value]),
}

impl ItemMut<'_> {
    /// Reborrow as a read-only [`Item`].
    pub fn as_item(&self) -> Item<'_> {
        match self {
            Self::Record(r) => Item::Record(&**r),
            Self::Map(m) => Item::Map(m),
            Self::Values(v) => Item::Values(v),
        }
    }
}
