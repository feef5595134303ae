#![cfg(feature = "derive")]

use std::sync::Arc;

use dialorm::{
    Item, ItemMut, OrmAction, PostgresDialect, Record, RecordMeta, SqlServerDialect, SqlType,
    Table, Value,
};

#[derive(Debug, Default, Record)]
#[orm(table = "users", sequence = "users_id_seq")]
struct User {
    #[orm(id)]
    id: i64,
    name: String,
    email: Option<String>,
    #[orm(skip)]
    display: String,
}

#[derive(Debug, Default, Record)]
#[orm(table = "dbo.OrderLines")]
struct OrderLine {
    #[orm(id, column = "OrderId")]
    order_id: i32,
    #[orm(id, column = "LineNo")]
    line_no: i32,
    #[orm(column = "Qty")]
    qty: i32,
}

#[test]
fn record_meta_is_generated() {
    assert_eq!(User::TABLE, "users");
    assert_eq!(User::KEYS, "id");
    assert_eq!(User::KEY_MEMBER, Some("id"));
    assert_eq!(User::SEQUENCE, Some("users_id_seq"));

    assert_eq!(OrderLine::KEYS, "OrderId, LineNo");
    assert_eq!(OrderLine::KEY_MEMBER, None);
    assert_eq!(OrderLine::SEQUENCE, None);
}

#[test]
fn fields_carry_declared_types_and_skip_unmapped() {
    let user = User {
        display: "ignored".into(),
        ..User::default()
    };
    let fields = user.fields();
    let names: Vec<_> = fields.iter().map(|f| f.name.as_deref().unwrap()).collect();
    assert_eq!(names, ["id", "name", "email"]);
    assert_eq!(fields[0].declared_type, Some(SqlType::BigInt));
    // A `None` option still knows its type.
    assert_eq!(fields[2].value, Value::Null);
    assert_eq!(fields[2].declared_type, Some(SqlType::Text));
}

#[test]
fn sequence_insert_then_update_via_key_member() {
    let users = Table::for_record::<User>(Arc::new(PostgresDialect::new())).unwrap();
    let mut user = User {
        name: "bob".into(),
        ..User::default()
    };

    let cmd = users.action_command(OrmAction::Save, Item::record(&user)).unwrap();
    assert_eq!(cmd.action, OrmAction::Insert);
    assert_eq!(
        cmd.sql(),
        "INSERT INTO users (id, name, email) VALUES (nextval('users_id_seq'), :name, NULL);\n\
         SELECT currval('users_id_seq');"
    );
    assert_eq!(cmd.parameters().len(), 1);

    let outcome = users
        .upsert_item_pk(ItemMut::Record(&mut user), Value::BigInt(7), false)
        .unwrap();
    assert!(outcome.is_applied());
    assert_eq!(user.id, 7);

    let cmd = users.action_command(OrmAction::Save, Item::record(&user)).unwrap();
    assert_eq!(cmd.action, OrmAction::Update);
    assert_eq!(
        cmd.sql(),
        "UPDATE users SET name = :name, email = NULL WHERE id = :id"
    );
}

#[test]
fn set_field_converts_and_reports_unknown_columns() {
    let mut line = OrderLine::default();
    assert!(line.set_field("qty", Value::BigInt(3)).unwrap());
    assert_eq!(line.qty, 3);
    assert!(!line.set_field("Price", Value::Int(1)).unwrap());
    let err = line.set_field("LineNo", Value::Text("second".into())).unwrap_err();
    assert!(matches!(err, dialorm::OrmError::Conversion { .. }));
}

#[test]
fn compound_record_keys_cannot_take_a_generated_key() {
    let lines = Table::for_record::<OrderLine>(Arc::new(SqlServerDialect::new())).unwrap();
    assert!(lines.keys().sequence_name_or_identity_function().is_none());

    let mut line = OrderLine {
        order_id: 1,
        line_no: 2,
        qty: 5,
    };
    let cmd = lines.action_command(OrmAction::Save, Item::record(&line)).unwrap();
    assert_eq!(
        cmd.sql(),
        "UPDATE dbo.OrderLines SET Qty = @Qty WHERE OrderId = @OrderId AND LineNo = @LineNo"
    );

    let err = lines
        .upsert_item_pk(ItemMut::Record(&mut line), Value::Int(9), true)
        .unwrap_err();
    assert!(err.is_configuration());
}
