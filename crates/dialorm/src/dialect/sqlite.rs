use chrono::Utc;

use super::{
    ClockDefault, Dialect, TableInfoQuery, parse_default_literal, require_text, row_text,
};
use crate::error::{OrmError, OrmResult};
use crate::item::TaggedMap;
use crate::metadata::ColumnDescriptor;
use crate::params::BoundParameter;
use crate::value::Value;

/// SQLite: `@name` placeholders, rowid identity, `pragma_table_info` introspection.
///
/// SQLite stores date/time defaults as text, so `CURRENT_*` defaults resolve to
/// UTC strings rather than typed values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn build_table_info_query(&self, _owner: Option<&str>, table: &str) -> TableInfoQuery {
        TableInfoQuery {
            sql: "SELECT * FROM pragma_table_info(@0)".into(),
            args: vec![Value::Text(table.to_string())],
        }
    }

    fn normalize_table_info(
        &self,
        table: &str,
        rows: Vec<TaggedMap>,
    ) -> OrmResult<Vec<ColumnDescriptor>> {
        rows.iter()
            .map(|row| {
                let notnull = row
                    .get("notnull")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| OrmError::metadata(table, "table info 'notnull' is not an integer"))?;
                Ok(ColumnDescriptor {
                    name: require_text(table, row, "name")?,
                    data_type: row_text(table, row, "type")?.unwrap_or_default(),
                    nullable: notnull == 0,
                    default_expr: row_text(table, row, "dflt_value")?,
                    is_mapped: true,
                })
            })
            .collect()
    }

    fn column_default(&self, column: &ColumnDescriptor) -> Option<Value> {
        let expr = column.default_expr.as_deref()?;
        let now = Utc::now();
        match ClockDefault::parse(expr) {
            Some(ClockDefault::Time) => Some(Value::Text(now.format("%H:%M:%S").to_string())),
            Some(ClockDefault::Date) => Some(Value::Text(now.format("%Y-%m-%d").to_string())),
            Some(ClockDefault::Timestamp) => {
                Some(Value::Text(now.format("%Y-%m-%d %H:%M:%S").to_string()))
            }
            None => parse_default_literal(expr),
        }
    }

    fn identity_retrieval_function(&self) -> Option<&'static str> {
        Some("LAST_INSERT_ROWID()")
    }

    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    fn parameter_handle_name(&self, name: &str) -> String {
        self.deprefix_parameter_name(name)
    }

    fn set_value(&self, p: &mut BoundParameter, value: Value) {
        let value = match value {
            Value::Uuid(u) => Value::Text(u.hyphenated().to_string()),
            other => other,
        };
        p.db_type = value.sql_type();
        p.size = super::inferred_size(&value);
        p.value = value;
    }
}
