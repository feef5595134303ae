//! Table configuration.
//!
//! Built fluently or deserialized from JSON/TOML:
//!
//! ```ignore
//! let config = TableConfig::new("dbo.Users").provider("sqlserver").keys("Id");
//!
//! let config: TableConfig = serde_json::from_str(r#"{
//!     "provider": "npgsql",
//!     "table": "users",
//!     "keys": "id",
//!     "sequence": "users_id_seq"
//! }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::ident::{TableName, validate_column};
use crate::keys::SequenceSetting;

/// Configuration of one table instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Provider identifier resolved through the dialect registry.
    pub provider: Option<String>,
    /// Table name, optionally `owner.table`.
    pub table: Option<String>,
    /// Comma-separated primary key columns; empty for no key.
    pub keys: String,
    /// Omitted: dialect default. Empty: disabled. Otherwise the sequence
    /// name or identity function.
    pub sequence: Option<String>,
    /// Comma-separated column projection; omitted maps every column.
    pub columns: Option<String>,
    /// Truncate logged SQL to this many bytes. `None` logs it in full.
    pub sql_log_max_length: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            provider: None,
            table: None,
            keys: String::new(),
            sequence: None,
            columns: None,
            sql_log_max_length: Some(200),
        }
    }
}

impl TableConfig {
    /// Configuration for `table` with defaults.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Set the provider identifier.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the primary key specification.
    pub fn keys(mut self, keys: impl Into<String>) -> Self {
        self.keys = keys.into();
        self
    }

    /// Set the sequence name or identity function.
    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Disable sequence/identity handling, even where the dialect has a default.
    pub fn no_sequence(mut self) -> Self {
        self.sequence = Some(String::new());
        self
    }

    /// Restrict the mapped columns.
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    /// Set maximum SQL length to log.
    pub fn sql_log_max_length(mut self, len: Option<usize>) -> Self {
        self.sql_log_max_length = len;
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> OrmResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| OrmError::configuration(format!("Invalid table configuration: {e}")))
    }

    /// The validated table name.
    pub fn table_name(&self) -> OrmResult<TableName> {
        match self.table.as_deref().map(str::trim) {
            None | Some("") => Err(OrmError::configuration(
                "No table name has been specified",
            )),
            Some(name) => TableName::parse(name),
        }
    }

    pub fn sequence_setting(&self) -> SequenceSetting {
        SequenceSetting::from_option(self.sequence.as_deref())
    }

    /// The validated column projection, if any.
    pub fn column_projection(&self) -> OrmResult<Option<Vec<String>>> {
        let Some(spec) = self.columns.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if spec.is_empty() || spec == "*" {
            return Ok(None);
        }
        spec.split(',')
            .map(|c| {
                let c = c.trim();
                validate_column(c)?;
                Ok(c.to_string())
            })
            .collect::<OrmResult<Vec<_>>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = TableConfig::new("dbo.Users")
            .provider("sqlserver")
            .keys("Id")
            .columns("Id, Name")
            .sql_log_max_length(None);
        assert_eq!(config.table_name().unwrap().bare(), "Users");
        assert_eq!(config.sequence_setting(), SequenceSetting::DialectDefault);
        assert_eq!(
            config.column_projection().unwrap(),
            Some(vec!["Id".to_string(), "Name".to_string()])
        );
        assert_eq!(config.sql_log_max_length, None);
    }

    #[test]
    fn sequence_tri_state() {
        let config = TableConfig::new("t").no_sequence();
        assert_eq!(config.sequence_setting(), SequenceSetting::Disabled);
        let config = TableConfig::new("t").sequence("t_id_seq");
        assert_eq!(
            config.sequence_setting(),
            SequenceSetting::Named("t_id_seq".into())
        );
    }

    #[test]
    fn missing_table_is_a_configuration_error() {
        let err = TableConfig::default().table_name().unwrap_err();
        assert!(err.is_configuration());
        assert!(TableConfig::new("  ").table_name().unwrap_err().is_configuration());
    }

    #[test]
    fn from_json() {
        let config = TableConfig::from_json(
            r#"{"provider": "npgsql", "table": "users", "keys": "id", "sequence": ""}"#,
        )
        .unwrap();
        assert_eq!(config.provider.as_deref(), Some("npgsql"));
        assert_eq!(config.sequence_setting(), SequenceSetting::Disabled);
        assert_eq!(config.sql_log_max_length, Some(200));

        let err = TableConfig::from_json(r#"{"tabel": "users"}"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn star_projection_maps_everything() {
        let config = TableConfig::new("t").columns("*");
        assert_eq!(config.column_projection().unwrap(), None);
        assert!(TableConfig::new("t").columns("a, b c").column_projection().is_err());
    }
}
