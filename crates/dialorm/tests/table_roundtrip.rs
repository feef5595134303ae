use std::cell::RefCell;
use std::sync::Arc;

use dialorm::{
    Command, CommandParams, Direction, Item, ItemMut, OrmAction, OrmError, OrmResult,
    SqliteDialect, Table, TableConfig, TableInfoSource, TaggedMap, UpsertOutcome, Value,
    append_row_count_results,
};

/// In-memory stand-in for a live SQLite connection: answers `pragma_table_info`
/// from a fixed column list and records every command and argument it sees.
struct ScriptedSqlite {
    columns: Vec<(&'static str, &'static str, i64, Option<&'static str>)>,
    seen: RefCell<Vec<String>>,
    bound: RefCell<Vec<Value>>,
}

impl ScriptedSqlite {
    fn users() -> Self {
        Self {
            columns: vec![
                ("Id", "INTEGER", 1, None),
                ("Name", "TEXT", 1, None),
                ("Status", "TEXT", 1, Some("'draft'")),
                ("Score", "INTEGER", 0, Some("0")),
                ("CreatedOn", "TEXT", 0, Some("CURRENT_DATE")),
            ],
            seen: RefCell::new(Vec::new()),
            bound: RefCell::new(Vec::new()),
        }
    }
}

impl TableInfoSource for ScriptedSqlite {
    fn query(&self, command: &Command) -> OrmResult<Vec<TaggedMap>> {
        self.seen.borrow_mut().push(command.sql.clone());
        self.bound
            .borrow_mut()
            .extend(command.parameters.iter().map(|p| p.value.clone()));
        Ok(self
            .columns
            .iter()
            .map(|(name, ty, notnull, default)| {
                TaggedMap::new()
                    .with("name", *name)
                    .with("type", *ty)
                    .with("notnull", *notnull)
                    .with("dflt_value", default.map(str::to_string))
            })
            .collect())
    }
}

fn users_table() -> Table {
    let config = TableConfig::new("Users").keys("Id");
    Table::new(&config, Arc::new(SqliteDialect::new())).unwrap()
}

#[test]
fn save_inserts_then_updates_after_key_write_back() {
    let users = users_table();
    let mut item = TaggedMap::new().with("Id", 0i64).with("Name", "bob");

    let cmd = users.action_command(OrmAction::Save, &item).unwrap();
    assert_eq!(cmd.requested, OrmAction::Save);
    assert_eq!(cmd.action, OrmAction::Insert);
    assert_eq!(
        cmd.sql(),
        "INSERT INTO Users (Name) VALUES (@Name);\nSELECT LAST_INSERT_ROWID();"
    );
    assert_eq!(cmd.parameters().len(), 1);
    assert_eq!(cmd.parameters()[0].value, Value::Text("bob".into()));

    // The executor ran the insert and got key 42 back.
    let outcome = users
        .upsert_item_pk(ItemMut::Map(&mut item), Value::BigInt(42), false)
        .unwrap();
    assert!(outcome.is_applied());

    let cmd = users.action_command(OrmAction::Save, &item).unwrap();
    assert_eq!(cmd.action, OrmAction::Update);
    assert_eq!(cmd.sql(), "UPDATE Users SET Name = @Name WHERE Id = @Id");
    let values: Vec<_> = cmd.parameters().iter().map(|p| p.value.clone()).collect();
    assert_eq!(values, [Value::Text("bob".into()), Value::BigInt(42)]);
}

#[test]
fn positional_values_write_back_into_a_copy() {
    let users = users_table();
    let values = vec![Value::Int(7)];
    let cmd = users.action_command(OrmAction::Delete, &values).unwrap();
    assert_eq!(cmd.sql(), "DELETE FROM Users WHERE Id = @Id");

    let outcome = users
        .upsert_item_pk(ItemMut::Values(&values), Value::BigInt(8), true)
        .unwrap();
    let UpsertOutcome::Converted(copy) = outcome else {
        panic!("expected a converted copy, got {outcome:?}");
    };
    assert_eq!(copy.get("id"), Some(&Value::BigInt(8)));
}

#[test]
fn quoted_table_names_reach_introspection_as_arguments() {
    let config = TableConfig::new("\"User Table\"").keys("Id");
    let users = Table::new(&config, Arc::new(SqliteDialect::new())).unwrap();
    let db = ScriptedSqlite::users();

    users.table_meta_data(&db).unwrap();
    assert_eq!(db.seen.borrow().as_slice(), ["SELECT * FROM pragma_table_info(@0)"]);
    assert_eq!(db.bound.borrow().as_slice(), [Value::Text("User Table".into())]);

    let item = TaggedMap::new().with("Name", "bob");
    let cmd = users.action_command(OrmAction::Insert, &item).unwrap();
    assert!(cmd.sql().starts_with("INSERT INTO \"User Table\" (Name)"));
}

#[test]
fn metadata_loads_once_and_drives_new_item() {
    let users = users_table();
    let db = ScriptedSqlite::users();

    let columns = users.table_meta_data(&db).unwrap();
    assert_eq!(columns.len(), 5);
    assert!(!columns[0].nullable);
    assert!(columns[3].nullable);
    users.table_meta_data(&db).unwrap();
    assert_eq!(db.seen.borrow().as_slice(), ["SELECT * FROM pragma_table_info(@0)"]);
    assert_eq!(db.bound.borrow().as_slice(), [Value::Text("Users".into())]);
    assert_eq!(users.metadata_cache().load_count(), 1);

    let info = users.column_info(&db, "status").unwrap();
    assert_eq!(info.default_expr.as_deref(), Some("'draft'"));
    assert_eq!(
        users.column_default(&db, "Status").unwrap(),
        Some(Value::Text("draft".into()))
    );
    let err = users.column_info(&db, "Missing").unwrap_err();
    assert!(err.is_configuration());

    let supplied = TaggedMap::new().with("name", "alice").with("Bogus", 1i64);
    let item = users
        .new_item(&db, Some(Item::map(&supplied)), true)
        .unwrap();
    let names: Vec<_> = item.iter().map(|(k, _)| k.to_string()).collect();
    // Supplied values win; columns without a default are left out.
    assert_eq!(names, ["Name", "Status", "Score", "CreatedOn"]);
    assert_eq!(item.get("Name"), Some(&Value::Text("alice".into())));
    assert_eq!(item.get("Score"), Some(&Value::BigInt(0)));
    assert!(!item.contains_key("Bogus"));

    let bare = users.new_item(&db, None, false).unwrap();
    assert!(bare.is_empty());
}

#[test]
fn projection_leaves_unmapped_columns_out_of_new_items() {
    let config = TableConfig::new("Users").keys("Id").columns("Id, Name");
    let users = Table::new(&config, Arc::new(SqliteDialect::new())).unwrap();
    let db = ScriptedSqlite::users();

    let columns = users.table_meta_data(&db).unwrap();
    let mapped: Vec<_> = columns
        .iter()
        .filter(|c| c.is_mapped)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(mapped, ["Id", "Name"]);

    let item = users.new_item(&db, None, true).unwrap();
    assert!(item.is_empty());
}

#[test]
fn failed_metadata_load_is_final() {
    let users = users_table();
    let failing = |_: &Command| -> OrmResult<Vec<TaggedMap>> {
        Err(OrmError::Other("connection reset".into()))
    };

    let err = users.table_meta_data(&failing).unwrap_err();
    assert!(err.is_metadata());
    assert!(err.to_string().contains("connection reset"));

    // Never retried, even with a working source.
    let db = ScriptedSqlite::users();
    assert!(users.table_meta_data(&db).unwrap().is_empty());
    assert!(db.seen.borrow().is_empty());
    assert!(users.metadata_cache().failure().is_some());
    assert!(users.column_info(&db, "Name").unwrap_err().is_configuration());
}

#[test]
fn output_results_and_row_counts_round_trip() {
    let users = users_table();
    let input = TaggedMap::new().with("Name", "bob");
    let output = TaggedMap::new()
        .with("Total", Value::Int(0))
        .with("Affected", Value::RowCount);

    let mut cmd = users
        .create_command_with_params(
            "UPDATE Users SET Name = @Name; SELECT @Total = COUNT(*) FROM Users",
            CommandParams::new().input(&input).output(&output),
        )
        .unwrap();
    assert!(cmd.row_count_capture);
    assert_eq!(cmd.parameters.len(), 2);

    // The executor writes outputs back onto the handles it was given.
    let total = cmd.parameter_mut("Total").unwrap();
    assert_eq!(total.direction, Direction::Output);
    total.value = Value::Int(12);

    let mut results = cmd.results(users.dialect());
    append_row_count_results(3, Item::map(&output), &mut results);
    assert_eq!(results.get("total"), Some(&Value::Int(12)));
    assert_eq!(results.get("affected"), Some(&Value::BigInt(3)));
    assert!(!results.contains_key("Name"));
}
