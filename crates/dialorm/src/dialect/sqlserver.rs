use chrono::Utc;

use super::{ClockDefault, Dialect, TableInfoQuery, normalize_information_schema, parse_default_literal};
use crate::command::Command;
use crate::error::OrmResult;
use crate::item::TaggedMap;
use crate::metadata::ColumnDescriptor;
use crate::value::Value;

/// SQL Server: `@name` placeholders, `SCOPE_IDENTITY()` key retrieval.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    pub fn new() -> Self {
        Self
    }
}

/// SQL Server wraps stored defaults in parentheses, e.g. `((0))` or `(getdate())`.
fn strip_parens(mut expr: &str) -> &str {
    loop {
        let trimmed = expr.trim();
        match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            Some(inner) if balanced(inner) => expr = inner,
            _ => return trimmed,
        }
    }
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    let mut in_quote = false;
    for c in s.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn build_table_info_query(&self, owner: Option<&str>, table: &str) -> TableInfoQuery {
        let mut sql = String::from(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT \
             FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = @0",
        );
        let mut args = vec![Value::Text(table.to_string())];
        if let Some(owner) = owner {
            sql.push_str(" AND TABLE_SCHEMA = @1");
            args.push(Value::Text(owner.to_string()));
        }
        sql.push_str(" ORDER BY ORDINAL_POSITION");
        TableInfoQuery { sql, args }
    }

    fn normalize_table_info(
        &self,
        table: &str,
        rows: Vec<TaggedMap>,
    ) -> OrmResult<Vec<ColumnDescriptor>> {
        normalize_information_schema(table, rows)
    }

    fn column_default(&self, column: &ColumnDescriptor) -> Option<Value> {
        let expr = strip_parens(column.default_expr.as_deref()?);
        let lower = expr.to_ascii_lowercase();
        if lower == "newid()" || lower == "newsequentialid()" {
            return Some(Value::Uuid(uuid::Uuid::new_v4()));
        }
        // N'text' literals
        let expr = match expr.strip_prefix('N') {
            Some(rest) if rest.starts_with('\'') => rest,
            _ => expr,
        };
        match ClockDefault::parse(expr) {
            Some(clock) => Some(clock.typed_value(Utc::now())),
            None => parse_default_literal(expr),
        }
    }

    fn identity_retrieval_function(&self) -> Option<&'static str> {
        Some("SCOPE_IDENTITY()")
    }

    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    /// `SCOPE_IDENTITY()` returns `numeric(38,0)`; cast it so the executor
    /// reads an integer back.
    fn fixup_insert_command(&self, command: &mut Command) {
        let sql = &mut command.sql;
        let Some(pos) = sql.rfind("SELECT ") else {
            return;
        };
        let rest = sql[pos + "SELECT ".len()..].trim_end();
        let terminator = if rest.ends_with(';') { ";" } else { "" };
        let tail = rest.trim_end_matches(';').trim();
        if tail.to_ascii_uppercase().contains("IDENTITY") && !tail.starts_with("CAST(") {
            let replacement = format!("SELECT CAST({tail} AS BIGINT){terminator}");
            sql.replace_range(pos.., &replacement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(default_expr: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: "c".into(),
            data_type: "int".into(),
            nullable: false,
            default_expr: Some(default_expr.into()),
            is_mapped: true,
        }
    }

    #[test]
    fn parenthesised_defaults() {
        let d = SqlServerDialect::new();
        assert_eq!(d.column_default(&column("((0))")), Some(Value::BigInt(0)));
        assert_eq!(
            d.column_default(&column("(N'new')")),
            Some(Value::Text("new".into()))
        );
        assert!(matches!(
            d.column_default(&column("(getdate())")),
            Some(Value::Timestamp(_))
        ));
        assert!(matches!(
            d.column_default(&column("(newid())")),
            Some(Value::Uuid(_))
        ));
        assert_eq!(strip_parens("(a) + (b)"), "(a) + (b)");
    }

    #[test]
    fn identity_select_is_cast() {
        let d = SqlServerDialect::new();
        let mut cmd = Command::new("INSERT INTO t (a) VALUES (@a);\nSELECT SCOPE_IDENTITY();");
        d.fixup_insert_command(&mut cmd);
        assert_eq!(
            cmd.sql,
            "INSERT INTO t (a) VALUES (@a);\nSELECT CAST(SCOPE_IDENTITY() AS BIGINT);"
        );

        let mut plain = Command::new("INSERT INTO t (a) VALUES (@a)");
        d.fixup_insert_command(&mut plain);
        assert_eq!(plain.sql, "INSERT INTO t (a) VALUES (@a)");
    }
}
