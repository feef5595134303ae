//! Primary key descriptor.
//!
//! Parsed once per table from a comma-separated key specification plus the
//! sequence/identity setting, then shared read-only by every command build.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::validate_column;
use crate::item::RecordMeta;

/// Sequence / identity configuration as written by the user.
///
/// Omission and the empty string differ: omission picks the dialect default,
/// the empty string disables generated-key handling.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequenceSetting {
    /// Use the dialect's identity function (single-key, identity-based dialects only).
    #[default]
    DialectDefault,
    /// No sequence or identity retrieval.
    Disabled,
    /// A sequence name (sequence-based dialects) or identity function.
    Named(String),
}

impl SequenceSetting {
    /// `None` → dialect default, `Some("")` → disabled, otherwise named.
    pub fn from_option(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None => Self::DialectDefault,
            Some("") => Self::Disabled,
            Some(name) => Self::Named(name.to_string()),
        }
    }
}

/// Ordered primary key columns plus the resolved sequence/identity override.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryKeyDescriptor {
    keys: Vec<String>,
    ordinals: HashMap<String, usize>,
    sequence: Option<String>,
    key_member: Option<String>,
}

impl PrimaryKeyDescriptor {
    /// Parse `spec` with an already-resolved sequence name or identity function.
    ///
    /// An empty `spec` means "no primary key". A sequence requires exactly one key.
    pub fn parse(spec: &str, sequence: Option<&str>) -> OrmResult<Self> {
        let mut keys = Vec::new();
        let mut ordinals = HashMap::new();
        for raw in spec.split(',') {
            let name = raw.trim();
            if name.is_empty() {
                if spec.trim().is_empty() {
                    continue;
                }
                return Err(OrmError::configuration(format!(
                    "Empty key name in primary key list '{spec}'"
                )));
            }
            validate_column(name)?;
            if ordinals.insert(name.to_lowercase(), keys.len()).is_some() {
                return Err(OrmError::configuration(format!(
                    "Duplicate key name '{name}' in primary key list '{spec}'"
                )));
            }
            keys.push(name.to_string());
        }

        let sequence = sequence.map(str::trim).filter(|s| !s.is_empty());
        if let Some(seq) = sequence {
            if keys.len() != 1 {
                return Err(OrmError::configuration(format!(
                    "Sequence or identity function '{seq}' requires exactly one primary key, got {}",
                    keys.len()
                )));
            }
        }

        Ok(Self {
            keys,
            ordinals,
            sequence: sequence.map(str::to_string),
            key_member: None,
        })
    }

    /// Parse `spec`, resolving `setting` against `dialect`.
    pub fn resolve(spec: &str, setting: &SequenceSetting, dialect: &dyn Dialect) -> OrmResult<Self> {
        let mut pk = Self::parse(spec, None)?;
        match setting {
            SequenceSetting::Disabled => {}
            SequenceSetting::Named(name) => pk = Self::parse(spec, Some(name))?,
            SequenceSetting::DialectDefault => {
                if pk.count() == 1 && !dialect.is_sequence_based() {
                    pk.sequence = dialect.identity_retrieval_function().map(str::to_string);
                }
            }
        }
        Ok(pk)
    }

    /// Descriptor for a record type, bound to its key member.
    pub fn for_record<R: RecordMeta>(dialect: &dyn Dialect) -> OrmResult<Self> {
        let setting = SequenceSetting::from_option(R::SEQUENCE);
        let mut pk = Self::resolve(R::KEYS, &setting, dialect)?;
        pk.key_member = R::KEY_MEMBER.map(str::to_string);
        Ok(pk)
    }

    pub fn with_key_member(mut self, member: impl Into<String>) -> Self {
        self.key_member = Some(member.into());
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key column list as written back into SQL (`a, b`).
    pub fn field_names(&self) -> String {
        self.keys.join(", ")
    }

    /// Canonical key name for `raw`, if it names a key (case-insensitive).
    pub fn is_key(&self, raw: &str) -> Option<&str> {
        self.ordinals
            .get(&raw.to_lowercase())
            .map(|&i| self.keys[i].as_str())
    }

    /// Ordinal of a key in declared order.
    pub fn ordinal(&self, raw: &str) -> Option<usize> {
        self.ordinals.get(&raw.to_lowercase()).copied()
    }

    /// Map a positional value to its key name.
    pub fn check_get_key_name(&self, ordinal: usize, context: &str) -> OrmResult<&str> {
        self.keys
            .get(ordinal)
            .map(String::as_str)
            .ok_or_else(|| {
                OrmError::configuration(format!(
                    "{context} (value #{ordinal}, {} primary key(s))",
                    self.keys.len()
                ))
            })
    }

    /// `k1 = @k1 AND k2 = @k2`, in declared key order.
    pub fn where_for_keys(&self, dialect: &dyn Dialect) -> String {
        self.keys
            .iter()
            .map(|k| format!("{k} = {}", dialect.prefix_parameter_name(k)))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn sequence_name_or_identity_function(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    /// Record field bound to the sole key.
    pub fn key_member(&self) -> Option<&str> {
        self.key_member.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqlServerDialect, SqliteDialect};

    #[test]
    fn parses_and_looks_up_case_insensitively() {
        let pk = PrimaryKeyDescriptor::parse(" OrderId , LineNo ", None).unwrap();
        assert_eq!(pk.count(), 2);
        assert_eq!(pk.keys(), ["OrderId", "LineNo"]);
        assert_eq!(pk.is_key("orderid"), Some("OrderId"));
        assert_eq!(pk.is_key("LINENO"), Some("LineNo"));
        assert_eq!(pk.is_key("Name"), None);
        assert_eq!(pk.ordinal("lineno"), Some(1));
    }

    #[test]
    fn empty_spec_means_no_keys() {
        let pk = PrimaryKeyDescriptor::parse("", None).unwrap();
        assert!(pk.is_empty());
        assert!(PrimaryKeyDescriptor::parse("a,,b", None).unwrap_err().is_configuration());
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = PrimaryKeyDescriptor::parse("Id, id", None).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn sequence_requires_single_key() {
        let err = PrimaryKeyDescriptor::parse("a, b", Some("seq")).unwrap_err();
        assert!(err.is_configuration());
        let pk = PrimaryKeyDescriptor::parse("a", Some("seq")).unwrap();
        assert_eq!(pk.sequence_name_or_identity_function(), Some("seq"));
        let pk = PrimaryKeyDescriptor::parse("a, b", Some("")).unwrap();
        assert_eq!(pk.sequence_name_or_identity_function(), None);
    }

    #[test]
    fn positional_key_names() {
        let pk = PrimaryKeyDescriptor::parse("a, b", None).unwrap();
        assert_eq!(pk.check_get_key_name(1, "too many values").unwrap(), "b");
        let err = pk.check_get_key_name(2, "too many values").unwrap_err();
        assert!(err.to_string().contains("too many values"));
    }

    #[test]
    fn where_for_keys_follows_declared_order() {
        let pk = PrimaryKeyDescriptor::parse("a, b", None).unwrap();
        assert_eq!(
            pk.where_for_keys(&SqlServerDialect::new()),
            "a = @a AND b = @b"
        );
        assert_eq!(pk.where_for_keys(&PostgresDialect::new()), "a = :a AND b = :b");
    }

    #[test]
    fn sequence_setting_resolution() {
        let sqlite = SqliteDialect::new();
        let pg = PostgresDialect::new();

        let pk = PrimaryKeyDescriptor::resolve("Id", &SequenceSetting::DialectDefault, &sqlite)
            .unwrap();
        assert_eq!(
            pk.sequence_name_or_identity_function(),
            Some("LAST_INSERT_ROWID()")
        );

        let pk =
            PrimaryKeyDescriptor::resolve("Id", &SequenceSetting::DialectDefault, &pg).unwrap();
        assert_eq!(pk.sequence_name_or_identity_function(), None);

        let pk = PrimaryKeyDescriptor::resolve("a, b", &SequenceSetting::DialectDefault, &sqlite)
            .unwrap();
        assert_eq!(pk.sequence_name_or_identity_function(), None);

        let pk = PrimaryKeyDescriptor::resolve("Id", &SequenceSetting::Disabled, &sqlite).unwrap();
        assert_eq!(pk.sequence_name_or_identity_function(), None);

        let setting = SequenceSetting::from_option(Some("users_id_seq"));
        let pk = PrimaryKeyDescriptor::resolve("Id", &setting, &pg).unwrap();
        assert_eq!(pk.sequence_name_or_identity_function(), Some("users_id_seq"));

        assert_eq!(SequenceSetting::from_option(Some("  ")), SequenceSetting::Disabled);
        assert_eq!(SequenceSetting::from_option(None), SequenceSetting::DialectDefault);
    }
}
