use chrono::Utc;

use super::{ClockDefault, Dialect, TableInfoQuery, normalize_information_schema, parse_default_literal};
use crate::error::OrmResult;
use crate::item::TaggedMap;
use crate::metadata::ColumnDescriptor;
use crate::params::BoundParameter;
use crate::value::Value;

/// MySQL: `@name` placeholders, `LAST_INSERT_ID()` key retrieval.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn build_table_info_query(&self, owner: Option<&str>, table: &str) -> TableInfoQuery {
        let mut args = vec![Value::Text(table.to_string())];
        let schema = match owner {
            Some(owner) => {
                args.push(Value::Text(owner.to_string()));
                "@1"
            }
            None => "DATABASE()",
        };
        TableInfoQuery {
            sql: format!(
                "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT \
                 FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = @0 AND TABLE_SCHEMA = {schema} \
                 ORDER BY ORDINAL_POSITION"
            ),
            args,
        }
    }

    fn normalize_table_info(
        &self,
        table: &str,
        rows: Vec<TaggedMap>,
    ) -> OrmResult<Vec<ColumnDescriptor>> {
        normalize_information_schema(table, rows)
    }

    /// MySQL reports literal defaults unquoted (`0`, `guest`).
    fn column_default(&self, column: &ColumnDescriptor) -> Option<Value> {
        let expr = column.default_expr.as_deref()?;
        if let Some(clock) = ClockDefault::parse(expr) {
            return Some(clock.typed_value(Utc::now()));
        }
        parse_default_literal(expr).or_else(|| Some(Value::Text(expr.to_string())))
    }

    fn identity_retrieval_function(&self) -> Option<&'static str> {
        Some("LAST_INSERT_ID()")
    }

    fn parameter_prefix(&self) -> &'static str {
        "@"
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
