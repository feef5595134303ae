use chrono::Utc;

use super::{ClockDefault, Dialect, TableInfoQuery, normalize_information_schema, parse_default_literal};
use crate::error::OrmResult;
use crate::item::TaggedMap;
use crate::metadata::ColumnDescriptor;
use crate::params::BoundParameter;
use crate::types::SqlType;
use crate::value::Value;

/// PostgreSQL: `:name` placeholders, sequence-generated keys, refcursors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn build_table_info_query(&self, owner: Option<&str>, table: &str) -> TableInfoQuery {
        let mut sql = String::from(
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns WHERE table_name = :0",
        );
        let mut args = vec![Value::Text(table.to_string())];
        if let Some(owner) = owner {
            sql.push_str(" AND table_schema = :1");
            args.push(Value::Text(owner.to_string()));
        }
        sql.push_str(" ORDER BY ordinal_position");
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
        let expr = column.default_expr.as_deref()?.trim();
        let lower = expr.to_ascii_lowercase();
        // Sequence-backed defaults are generated by the database.
        if lower.starts_with("nextval(") {
            return None;
        }
        if lower == "gen_random_uuid()" || lower == "uuid_generate_v4()" {
            return Some(Value::Uuid(uuid::Uuid::new_v4()));
        }
        let now = Utc::now();
        match ClockDefault::parse(expr) {
            Some(ClockDefault::Timestamp) if lower == "localtimestamp" => {
                Some(Value::Timestamp(now.naive_utc()))
            }
            Some(ClockDefault::Timestamp) => Some(Value::TimestampTz(now)),
            Some(clock) => Some(clock.typed_value(now)),
            None => parse_default_literal(expr),
        }
    }

    fn is_sequence_based(&self) -> bool {
        true
    }

    fn parameter_prefix(&self) -> &'static str {
        ":"
    }

    fn build_nextval(&self, sequence: &str) -> String {
        format!("nextval('{sequence}')")
    }

    fn build_currval_select(&self, sequence: &str) -> String {
        format!("SELECT currval('{sequence}')")
    }

    fn set_cursor(&self, p: &mut BoundParameter, cursor: Option<String>) -> bool {
        p.db_type = Some(SqlType::RefCursor);
        p.size = None;
        p.value = Value::Cursor(cursor);
        true
    }

    fn set_anonymous_parameter(&self, p: &mut BoundParameter) -> bool {
        p.name.clear();
        p.anonymous = true;
        true
    }

    fn ignores_output_types(&self, _p: &BoundParameter) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(default_expr: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: "c".into(),
            data_type: "text".into(),
            nullable: true,
            default_expr: Some(default_expr.into()),
            is_mapped: true,
        }
    }

    #[test]
    fn owner_adds_schema_filter() {
        let d = PostgresDialect::new();
        let q = d.build_table_info_query(None, "users");
        assert!(!q.sql.contains("table_schema"));
        assert_eq!(q.args, vec![Value::Text("users".into())]);

        let q = d.build_table_info_query(Some("app"), "users");
        assert!(q.sql.contains("table_schema = :1"));
        assert_eq!(q.args.len(), 2);
    }

    #[test]
    fn defaults() {
        let d = PostgresDialect::new();
        assert_eq!(d.column_default(&column("nextval('users_id_seq'::regclass)")), None);
        assert_eq!(
            d.column_default(&column("'guest'::character varying")),
            Some(Value::Text("guest".into()))
        );
        assert!(matches!(
            d.column_default(&column("now()")),
            Some(Value::TimestampTz(_))
        ));
        assert!(matches!(
            d.column_default(&column("gen_random_uuid()")),
            Some(Value::Uuid(_))
        ));
        assert_eq!(d.column_default(&column("false")), Some(Value::Bool(false)));
    }

    #[test]
    fn sequence_expressions() {
        let d = PostgresDialect::new();
        assert!(d.is_sequence_based());
        assert_eq!(d.identity_retrieval_function(), None);
        assert_eq!(d.build_nextval("users_id_seq"), "nextval('users_id_seq')");
        assert_eq!(
            d.build_currval_select("users_id_seq"),
            "SELECT currval('users_id_seq')"
        );
        assert_eq!(d.prefix_parameter_name("id"), ":id");
    }
}
