//! SQL dialect plugins.
//!
//! A [`Dialect`] captures one SQL engine's syntax and capability profile:
//! parameter prefixes, identity vs. sequence key generation, introspection
//! queries and cursor support. Every method is pure given its inputs;
//! dialects differ only in the text and behavior they return, never in the
//! calling contract.
//!
//! Built-in dialects:
//!
//! - [`SqliteDialect`]: identity-based via `LAST_INSERT_ROWID()`, `pragma_table_info` introspection
//! - [`PostgresDialect`]: sequence-based, cursors and anonymous parameters
//! - [`SqlServerDialect`]: identity-based via `SCOPE_IDENTITY()`, with an insert fixup
//! - [`MySqlDialect`]: identity-based via `LAST_INSERT_ID()`

mod mysql;
mod postgres;
mod registry;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use registry::{DialectRegistration, DialectRegistry};
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use chrono::{DateTime, Utc};

use crate::command::Command;
use crate::error::{OrmError, OrmResult};
use crate::item::TaggedMap;
use crate::metadata::ColumnDescriptor;
use crate::params::{BoundParameter, Direction};
use crate::types::SqlType;
use crate::value::Value;

/// Separator placed between the insert and the key retrieval statement.
pub const STATEMENT_SEPARATOR: &str = ";\n";

/// Introspection SQL plus its positional arguments (named `0`, `1`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfoQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

/// One SQL dialect's syntax differences.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Short dialect name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Introspection query listing the columns of `table`.
    fn build_table_info_query(&self, owner: Option<&str>, table: &str) -> TableInfoQuery;

    /// Turn raw introspection rows into ordered column descriptors.
    fn normalize_table_info(&self, table: &str, rows: Vec<TaggedMap>)
    -> OrmResult<Vec<ColumnDescriptor>>;

    /// Resolve a column's database default into a concrete value, if recognized.
    fn column_default(&self, column: &ColumnDescriptor) -> Option<Value>;

    /// Function retrieving the last generated identity, for identity-based dialects.
    fn identity_retrieval_function(&self) -> Option<&'static str> {
        None
    }

    /// Whether keys are generated from named sequences.
    fn is_sequence_based(&self) -> bool {
        false
    }

    /// Prefix used for parameter placeholders in SQL text.
    fn parameter_prefix(&self) -> &'static str;

    /// Placeholder for `name` in SQL text. Already-prefixed names are kept as is.
    fn prefix_parameter_name(&self, name: &str) -> String {
        let prefix = self.parameter_prefix();
        if name.starts_with(prefix) {
            name.to_string()
        } else {
            format!("{prefix}{name}")
        }
    }

    /// Name given to the parameter handle itself (some drivers want it bare).
    fn parameter_handle_name(&self, name: &str) -> String {
        self.prefix_parameter_name(name)
    }

    /// Strip the placeholder prefix from a parameter handle name.
    fn deprefix_parameter_name(&self, name: &str) -> String {
        name.strip_prefix(self.parameter_prefix())
            .unwrap_or(name)
            .to_string()
    }

    fn build_insert(&self, table: &str, columns: &str, values: &str) -> String {
        format!("INSERT INTO {table} ({columns}) VALUES ({values})")
    }

    fn build_update(&self, table: &str, set: &str, where_clause: &str) -> String {
        format!("UPDATE {table} SET {set} WHERE {where_clause}")
    }

    fn build_delete(&self, table: &str, where_clause: &str) -> String {
        format!("DELETE FROM {table} WHERE {where_clause}")
    }

    /// "Next value of sequence" expression.
    fn build_nextval(&self, sequence: &str) -> String {
        format!("NEXT VALUE FOR {sequence}")
    }

    /// Statement selecting the current value of a sequence.
    fn build_currval_select(&self, sequence: &str) -> String {
        format!("SELECT CURRENT VALUE FOR {sequence}")
    }

    /// Adjust an insert command that retrieves a generated key.
    fn fixup_insert_command(&self, command: &mut Command) {
        let _ = command;
    }

    fn set_direction(&self, p: &mut BoundParameter, direction: Direction) {
        p.direction = direction;
    }

    /// Set a parameter value, inferring storage type and size like a driver would.
    fn set_value(&self, p: &mut BoundParameter, value: Value) {
        p.db_type = value.sql_type();
        p.size = inferred_size(&value);
        p.value = value;
    }

    /// Read a parameter value back after execution.
    fn get_value(&self, p: &BoundParameter) -> Value {
        p.value.clone()
    }

    /// Bind a cursor reference. Returns `false` when cursors are unsupported.
    fn set_cursor(&self, p: &mut BoundParameter, cursor: Option<String>) -> bool {
        let _ = (p, cursor);
        false
    }

    /// Make the parameter positional/unnamed. Returns `false` when unsupported.
    fn set_anonymous_parameter(&self, p: &mut BoundParameter) -> bool {
        let _ = p;
        false
    }

    /// Whether the driver ignores declared types on non-input parameters,
    /// so untyped output nulls are acceptable.
    fn ignores_output_types(&self, p: &BoundParameter) -> bool {
        let _ = p;
        false
    }
}

pub(crate) fn inferred_size(value: &Value) -> Option<usize> {
    match value {
        Value::Text(s) => Some(s.len()),
        Value::Bytes(b) => Some(b.len()),
        other => other.sql_type().and_then(SqlType::fixed_size),
    }
}

/// Read a text cell from an introspection row (case-insensitive column name).
pub(crate) fn row_text(table: &str, row: &TaggedMap, column: &str) -> OrmResult<Option<String>> {
    match row.get(column) {
        Some(v) => Ok(v.to_text()),
        None => Err(OrmError::metadata(
            table,
            format!("table info row has no '{column}' column"),
        )),
    }
}

pub(crate) fn require_text(table: &str, row: &TaggedMap, column: &str) -> OrmResult<String> {
    row_text(table, row, column)?
        .ok_or_else(|| OrmError::metadata(table, format!("table info column '{column}' is null")))
}

/// Normalize information-schema style rows
/// (`COLUMN_NAME`, `DATA_TYPE`, `IS_NULLABLE`, `COLUMN_DEFAULT`).
pub(crate) fn normalize_information_schema(
    table: &str,
    rows: Vec<TaggedMap>,
) -> OrmResult<Vec<ColumnDescriptor>> {
    rows.iter()
        .map(|row| {
            let nullable = require_text(table, row, "IS_NULLABLE")?;
            Ok(ColumnDescriptor {
                name: require_text(table, row, "COLUMN_NAME")?,
                data_type: require_text(table, row, "DATA_TYPE")?,
                nullable: nullable.eq_ignore_ascii_case("YES"),
                default_expr: row_text(table, row, "COLUMN_DEFAULT")?.filter(|d| !d.is_empty()),
                is_mapped: true,
            })
        })
        .collect()
}

/// The "current time" family of default functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClockDefault {
    Timestamp,
    Date,
    Time,
}

impl ClockDefault {
    pub(crate) fn parse(expr: &str) -> Option<Self> {
        let upper = expr.trim().trim_end_matches("()").to_ascii_uppercase();
        match upper.as_str() {
            "CURRENT_TIMESTAMP" | "NOW" | "LOCALTIMESTAMP" | "GETDATE" | "SYSDATETIME"
            | "GETUTCDATE" | "SYSUTCDATETIME" | "TRANSACTION_TIMESTAMP" => Some(Self::Timestamp),
            "CURRENT_DATE" | "CURDATE" => Some(Self::Date),
            "CURRENT_TIME" | "LOCALTIME" | "CURTIME" => Some(Self::Time),
            _ => None,
        }
    }

    pub(crate) fn typed_value(self, now: DateTime<Utc>) -> Value {
        match self {
            Self::Timestamp => Value::Timestamp(now.naive_utc()),
            Self::Date => Value::Date(now.date_naive()),
            Self::Time => Value::Time(now.time()),
        }
    }
}

/// Parse a literal default expression: quoted strings (with `''` escapes and an
/// optional `::type` cast), numbers and booleans. `NULL` and anything
/// unrecognized yield `None`.
pub(crate) fn parse_default_literal(expr: &str) -> Option<Value> {
    let mut s = expr.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if let Some(stripped) = s.strip_prefix('\'') {
        let end = find_closing_quote(stripped)?;
        return Some(Value::Text(stripped[..end].replace("''", "'")));
    }
    if let Some((head, _cast)) = s.split_once("::") {
        s = head.trim();
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::BigInt(i));
    }
    if let Ok(f) = s.parse::<f64>() {
        return Some(Value::Double(f));
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

fn find_closing_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}
