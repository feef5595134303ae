//! The owning table instance.
//!
//! A [`Table`] is built once from a [`TableConfig`]: the dialect is resolved,
//! the table name validated and the primary key descriptor parsed at
//! construction. After that it is shared freely between threads; command
//! building is lock-free and only the first metadata access blocks.

use std::sync::Arc;

use crate::action::{ActionCommandBuilder, OrmAction, UpsertOutcome, upsert_item_pk};
use crate::command::{ActionCommand, Command};
use crate::config::TableConfig;
use crate::dialect::{Dialect, DialectRegistry};
use crate::error::{OrmError, OrmResult};
use crate::ident::{TableName, validate_column};
use crate::item::{Item, ItemMut, Record, RecordMeta, TaggedMap};
use crate::keys::PrimaryKeyDescriptor;
use crate::metadata::{ColumnDescriptor, TableInfoSource, TableMetadataCache, apply_projection};
use crate::params::{Direction, KeyFilter, ParameterBinder};
use crate::trace::SqlTrace;
use crate::value::Value;

/// Named and positional parameter sets for [`Table::create_command_with_params`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParams<'a> {
    /// Auto-numbered positional arguments (`@0`, `@1`, ...).
    pub args: &'a [Value],
    pub input: Option<Item<'a>>,
    pub output: Option<Item<'a>>,
    pub input_output: Option<Item<'a>>,
    pub return_value: Option<Item<'a>>,
}

impl<'a> CommandParams<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn args(mut self, args: &'a [Value]) -> Self {
        self.args = args;
        self
    }

    pub fn input(mut self, item: impl Into<Item<'a>>) -> Self {
        self.input = Some(item.into());
        self
    }

    pub fn output(mut self, item: impl Into<Item<'a>>) -> Self {
        self.output = Some(item.into());
        self
    }

    pub fn input_output(mut self, item: impl Into<Item<'a>>) -> Self {
        self.input_output = Some(item.into());
        self
    }

    pub fn return_value(mut self, item: impl Into<Item<'a>>) -> Self {
        self.return_value = Some(item.into());
        self
    }
}

/// WHERE clause plus the named parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereSpec {
    /// ` WHERE a = @a AND b = @b`, or empty when there are no conditions.
    pub clause: String,
    pub params: TaggedMap,
}

/// One table: dialect, name, keys and cached metadata.
#[derive(Debug)]
pub struct Table {
    name: TableName,
    dialect: Arc<dyn Dialect>,
    keys: PrimaryKeyDescriptor,
    projection: Option<Vec<String>>,
    metadata: TableMetadataCache,
    trace: SqlTrace,
}

impl Table {
    /// Build a table for an already-resolved dialect.
    pub fn new(config: &TableConfig, dialect: Arc<dyn Dialect>) -> OrmResult<Self> {
        let name = config.table_name()?;
        let keys =
            PrimaryKeyDescriptor::resolve(&config.keys, &config.sequence_setting(), &*dialect)?;
        let projection = config.column_projection()?;
        Ok(Self {
            metadata: TableMetadataCache::new(name.as_sql()),
            name,
            dialect,
            keys,
            projection,
            trace: SqlTrace::new().max_sql_length(config.sql_log_max_length),
        })
    }

    /// Build a table, resolving `config.provider` through `registry`.
    pub fn from_registry(config: &TableConfig, registry: &DialectRegistry) -> OrmResult<Self> {
        let provider = config.provider.as_deref().ok_or_else(|| {
            OrmError::configuration("No provider has been specified for the table")
        })?;
        Self::new(config, registry.resolve(provider)?)
    }

    /// Build a table for a record type, with its key member bound.
    pub fn for_record<R: RecordMeta>(dialect: Arc<dyn Dialect>) -> OrmResult<Self> {
        let name = TableName::parse(R::TABLE)?;
        let keys = PrimaryKeyDescriptor::for_record::<R>(&*dialect)?;
        Ok(Self {
            metadata: TableMetadataCache::new(name.as_sql()),
            name,
            dialect,
            keys,
            projection: None,
            trace: SqlTrace::new(),
        })
    }

    /// Override how built commands are traced.
    pub fn with_trace(mut self, trace: SqlTrace) -> Self {
        self.trace = trace;
        self
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    pub fn keys(&self) -> &PrimaryKeyDescriptor {
        &self.keys
    }

    pub fn metadata_cache(&self) -> &TableMetadataCache {
        &self.metadata
    }

    pub fn binder(&self) -> ParameterBinder<'_> {
        ParameterBinder::new(&*self.dialect, &self.keys)
    }

    pub fn builder(&self) -> ActionCommandBuilder<'_> {
        ActionCommandBuilder::new(self.name.as_sql(), &*self.dialect, &self.keys)
    }

    /// Build the command for `action` on `item`.
    pub fn action_command<'i>(
        &self,
        action: OrmAction,
        item: impl Into<Item<'i>>,
    ) -> OrmResult<ActionCommand> {
        let command = self.builder().build(action, item.into())?;
        self.trace.command_built(
            self.name.as_sql(),
            command.requested,
            command.action,
            &command.command,
        );
        Ok(command)
    }

    /// Column metadata, loaded through `source` on first use.
    pub fn table_meta_data(
        &self,
        source: &dyn TableInfoSource,
    ) -> OrmResult<Arc<[ColumnDescriptor]>> {
        self.metadata.ensure_loaded(|| {
            let table = self.name.bare();
            let query = self.dialect.build_table_info_query(self.name.owner(), table);
            let mut command = Command::new(query.sql);
            self.binder().bind_args(&mut command, &query.args)?;
            let rows = source.query(&command).map_err(|e| match e {
                OrmError::Metadata { .. } => e,
                other => OrmError::metadata(table, other.to_string()),
            })?;
            let mut columns = self.dialect.normalize_table_info(table, rows)?;
            apply_projection(&mut columns, self.projection.as_deref());
            Ok(columns)
        })
    }

    /// Metadata for one column (case-insensitive).
    pub fn column_info(
        &self,
        source: &dyn TableInfoSource,
        column: &str,
    ) -> OrmResult<ColumnDescriptor> {
        self.table_meta_data(source)?
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .cloned()
            .ok_or_else(|| {
                OrmError::configuration(format!(
                    "Cannot find table info for column name {column} in {}",
                    self.name
                ))
            })
    }

    /// Database default for one column, freshly resolved on each call.
    pub fn column_default(
        &self,
        source: &dyn TableInfoSource,
        column: &str,
    ) -> OrmResult<Option<Value>> {
        let info = self.column_info(source, column)?;
        Ok(self.dialect.column_default(&info))
    }

    /// Materialize a new item driven by the mapped table columns.
    ///
    /// Supplied values win; with `add_defaults`, other columns get the
    /// database default where one is known. Null values are left out.
    pub fn new_item(
        &self,
        source: &dyn TableInfoSource,
        values: Option<Item<'_>>,
        add_defaults: bool,
    ) -> OrmResult<TaggedMap> {
        let supplied = values.map(|v| v.to_map()).unwrap_or_default();
        let mut item = TaggedMap::new();
        for column in self.table_meta_data(source)?.iter() {
            if !column.is_mapped {
                continue;
            }
            let value = match supplied.get(&column.name) {
                Some(v) => Some(v.clone()),
                None if add_defaults => self.dialect.column_default(column),
                None => None,
            };
            if let Some(value) = value.filter(|v| !v.is_null()) {
                item.insert(column.name.clone(), value);
            }
        }
        Ok(item)
    }

    /// [`Table::new_item`] into a typed record.
    pub fn new_record<R: Record + Default>(
        &self,
        source: &dyn TableInfoSource,
        add_defaults: bool,
    ) -> OrmResult<R> {
        let mut record = R::default();
        for (column, value) in self.new_item(source, None, add_defaults)?.iter() {
            record.set_field(column, value.clone())?;
        }
        Ok(record)
    }

    /// True only if `item` carries every primary key field.
    pub fn has_primary_key<'i>(&self, item: impl Into<Item<'i>>) -> bool {
        let found = item
            .into()
            .fields()
            .iter()
            .filter_map(|f| f.name.as_deref())
            .filter(|n| self.keys.is_key(n).is_some())
            .count();
        !self.keys.is_empty() && found == self.keys.count()
    }

    /// Primary key values of `item`, in declared key order.
    pub fn primary_key_values<'i>(&self, item: impl Into<Item<'i>>) -> OrmResult<Vec<Value>> {
        let mut values = vec![None; self.keys.count()];
        for field in item.into().fields() {
            if let Some(i) = field.name.as_deref().and_then(|n| self.keys.ordinal(n)) {
                values[i] = Some(field.value);
            }
        }
        values.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| {
            OrmError::key_mismatch(format!(
                "Primary key field(s) {} not present in item for {}",
                self.keys.field_names(),
                self.name
            ))
        })
    }

    /// WHERE clause for a primary-key style lookup.
    ///
    /// Value-only params are mapped onto the primary key in declared order;
    /// named params become `col = @col` conditions.
    pub fn where_spec<'i>(&self, params: impl Into<Item<'i>>) -> OrmResult<WhereSpec> {
        let params = params.into();
        let mut named = TaggedMap::new();

        if !params.has_names() {
            let fields = params.fields();
            if fields.len() != self.keys.count() || self.keys.is_empty() {
                return Err(OrmError::key_mismatch(format!(
                    "{} value(s) given for primary key {} of {}",
                    fields.len(),
                    self.keys.field_names(),
                    self.name
                )));
            }
            for (key, field) in self.keys.keys().iter().zip(fields) {
                named.insert(key.as_str(), field.value);
            }
            return Ok(WhereSpec {
                clause: format!(" WHERE {}", self.keys.where_for_keys(&*self.dialect)),
                params: named,
            });
        }

        let mut predicates = Vec::new();
        for field in params.fields() {
            let name = field.name.unwrap_or_default();
            validate_column(&name)?;
            predicates.push(format!("{name} = {}", self.dialect.prefix_parameter_name(&name)));
            named.insert(name, field.value);
        }
        let clause = if predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicates.join(" AND "))
        };
        Ok(WhereSpec {
            clause,
            params: named,
        })
    }

    /// General-purpose command with positional and named, directional parameters.
    ///
    /// [`Command::row_count_capture`] reports whether the output set carried
    /// a row-count sentinel.
    pub fn create_command_with_params(
        &self,
        sql: impl Into<String>,
        params: CommandParams<'_>,
    ) -> OrmResult<Command> {
        let mut command = Command::new(sql);
        let binder = self.binder();
        binder.bind_args(&mut command, params.args)?;
        let sets = [
            (params.input, Direction::Input),
            (params.output, Direction::Output),
            (params.input_output, Direction::InputOutput),
            (params.return_value, Direction::ReturnValue),
        ];
        for (set, direction) in sets {
            if let Some(item) = set {
                binder.bind_named(&mut command, item, direction, KeyFilter::All)?;
            }
        }
        Ok(command)
    }

    /// Write a generated key back into `item`.
    pub fn upsert_item_pk(
        &self,
        item: ItemMut<'_>,
        pk: Value,
        create_if_needed: bool,
    ) -> OrmResult<UpsertOutcome> {
        upsert_item_pk(item, &self.keys, pk, create_if_needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{SqlServerDialect, SqliteDialect};

    fn users() -> Table {
        let config = TableConfig::new("Users").keys("Id");
        Table::new(&config, Arc::new(SqliteDialect::new())).unwrap()
    }

    #[test]
    fn missing_provider_or_table() {
        let registry = DialectRegistry::new();
        let err = Table::from_registry(&TableConfig::new("t"), &registry).unwrap_err();
        assert!(err.is_configuration());
        let config = TableConfig::default().provider("sqlite");
        assert!(Table::from_registry(&config, &registry).unwrap_err().is_configuration());
        let config = TableConfig::new("t").provider("db2");
        assert!(matches!(
            Table::from_registry(&config, &registry).unwrap_err(),
            OrmError::UnknownProvider(_)
        ));
    }

    #[test]
    fn has_primary_key_and_values() {
        let table = users();
        let item = TaggedMap::new().with("id", 4i64).with("Name", "x");
        assert!(table.has_primary_key(&item));
        assert_eq!(table.primary_key_values(&item).unwrap(), [Value::BigInt(4)]);

        let item = TaggedMap::new().with("Name", "x");
        assert!(!table.has_primary_key(&item));
        assert!(table.primary_key_values(&item).unwrap_err().is_key_mismatch());
    }

    #[test]
    fn where_spec_from_values_and_names() {
        let config = TableConfig::new("t").keys("a, b");
        let table = Table::new(&config, Arc::new(SqlServerDialect::new())).unwrap();

        let values = vec![Value::Int(1), Value::Int(2)];
        let spec = table.where_spec(&values).unwrap();
        assert_eq!(spec.clause, " WHERE a = @a AND b = @b");
        assert_eq!(spec.params.get("b"), Some(&Value::Int(2)));

        let short = vec![Value::Int(1)];
        assert!(table.where_spec(&short).unwrap_err().is_key_mismatch());

        let named = TaggedMap::new().with("Status", "open");
        let spec = table.where_spec(&named).unwrap();
        assert_eq!(spec.clause, " WHERE Status = @Status");

        let spec = table.where_spec(&TaggedMap::new()).unwrap();
        assert_eq!(spec.clause, "");
    }

    #[test]
    fn where_spec_rejects_names_that_are_not_columns() {
        let config = TableConfig::new("t").keys("a");
        let table = Table::new(&config, Arc::new(SqlServerDialect::new())).unwrap();

        let named = TaggedMap::new().with("Status = 1 OR 1", 1i64);
        let err = table.where_spec(&named).unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));

        let dotted = TaggedMap::new().with("t.Status", "open");
        assert!(table.where_spec(&dotted).is_err());
    }

    #[test]
    fn command_with_params_binds_every_direction() {
        let config = TableConfig::new("t");
        let table = Table::new(&config, Arc::new(SqlServerDialect::new())).unwrap();
        let args = [Value::Int(10)];
        let input = TaggedMap::new().with("a", 1i64);
        let output = TaggedMap::new()
            .with("total", Value::Int(0))
            .with("affected", Value::RowCount);
        let ret = TaggedMap::new().with("rc", Value::Int(0));

        let cmd = table
            .create_command_with_params(
                "EXEC p @0, @a, @total OUTPUT",
                CommandParams::new()
                    .args(&args)
                    .input(&input)
                    .output(&output)
                    .return_value(&ret),
            )
            .unwrap();
        let names: Vec<_> = cmd.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@0", "@a", "@total", "@rc"]);
        assert!(cmd.row_count_capture);
        assert_eq!(cmd.parameters[3].direction, Direction::ReturnValue);
    }
}
