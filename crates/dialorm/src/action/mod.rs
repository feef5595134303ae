//! Write-path command building.
//!
//! [`ActionCommandBuilder`] classifies an item's fields into key and non-key,
//! resolves `Save` to `Insert` or `Update`, and assembles the dialect-correct
//! SQL plus bound parameters. [`upsert_item_pk`] writes a generated key back
//! into the item after an insert.

mod upsert;


pub use upsert::{UpsertOutcome, upsert_item_pk};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::{ActionCommand, Command};
use crate::dialect::{Dialect, STATEMENT_SEPARATOR};
use crate::error::{OrmError, OrmResult};
use crate::ident::validate_column;
use crate::item::{Item, NameValueType};
use crate::keys::PrimaryKeyDescriptor;
use crate::params::{Direction, ParamName, ParameterBinder};
use crate::types::SqlType;
use crate::value::Value;

/// Write action on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrmAction {
    Insert,
    Update,
    Delete,
    /// Insert or update, decided from the item's key values.
    Save,
}

impl fmt::Display for OrmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Save => "Save",
        })
    }
}

/// State of one primary key field in an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Supplied with a non-default value.
    Present,
    /// Supplied as null or as its declared type's default value.
    DefaultValue,
    /// Not supplied by the item.
    Absent,
}

impl KeyState {
    pub fn classify(value: &Value, declared: Option<SqlType>) -> Self {
        if value.is_default_for(declared) {
            Self::DefaultValue
        } else {
            Self::Present
        }
    }
}

/// Per-key states in declared key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStates(Vec<KeyState>);

impl KeyStates {
    fn new(count: usize) -> Self {
        Self(vec![KeyState::Absent; count])
    }

    pub fn states(&self) -> &[KeyState] {
        &self.0
    }

    /// Number of key fields the item supplied.
    pub fn supplied(&self) -> usize {
        self.0.iter().filter(|s| **s != KeyState::Absent).count()
    }

    /// Number of supplied key fields left at their default value.
    pub fn defaulted(&self) -> usize {
        self.0.iter().filter(|s| **s == KeyState::DefaultValue).count()
    }

    /// Save becomes Update only when every key is supplied and none is defaulted.
    pub fn resolve_save(&self) -> OrmAction {
        if self.supplied() > 0 && self.defaulted() == 0 {
            OrmAction::Update
        } else {
            OrmAction::Insert
        }
    }
}

/// A SQL fragment (`col`, `@col`, `col = @col`) plus the argument it references.
#[derive(Debug)]
struct Fragment {
    sql: String,
    arg: Option<usize>,
}

#[derive(Debug, Default)]
struct Fragments {
    insert_names: Vec<String>,
    insert_values: Vec<Fragment>,
    update_pairs: Vec<Fragment>,
    where_pairs: Vec<Fragment>,
}

fn join(fragments: &[Fragment], sep: &str) -> String {
    fragments
        .iter()
        .map(|f| f.sql.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Builds Insert/Update/Delete/Save commands for one table.
///
/// Holds no mutable state; concurrent builds need no locking.
#[derive(Clone, Copy)]
pub struct ActionCommandBuilder<'a> {
    table: &'a str,
    dialect: &'a dyn Dialect,
    keys: &'a PrimaryKeyDescriptor,
}

impl<'a> ActionCommandBuilder<'a> {
    /// `table` is the full (possibly owner-qualified) name used in DML.
    pub fn new(table: &'a str, dialect: &'a dyn Dialect, keys: &'a PrimaryKeyDescriptor) -> Self {
        Self {
            table,
            dialect,
            keys,
        }
    }

    /// Classify the key fields of `item` without building anything.
    pub fn key_states(&self, item: Item<'_>) -> OrmResult<KeyStates> {
        let mut states = KeyStates::new(self.keys.count());
        for (ordinal, field) in item.fields().into_iter().enumerate() {
            if let (_, Some(index)) = self.resolve_field(ordinal, &field)? {
                states.0[index] = KeyState::classify(&field.value, field.declared_type);
            }
        }
        Ok(states)
    }

    /// Field name plus key ordinal, if the field is a key.
    ///
    /// Unnamed (positional) fields are always keys, mapped by position.
    fn resolve_field(&self, ordinal: usize, field: &NameValueType) -> OrmResult<(String, Option<usize>)> {
        match &field.name {
            Some(name) => {
                validate_column(name)?;
                Ok((name.clone(), self.keys.ordinal(name)))
            }
            None => {
                let name = self.keys.check_get_key_name(
                    ordinal,
                    "Too many values trying to map value-only object to primary key list",
                )?;
                Ok((name.to_string(), Some(ordinal)))
            }
        }
    }

    /// Build the command for `action` on `item`.
    pub fn build(&self, action: OrmAction, item: Item<'_>) -> OrmResult<ActionCommand> {
        let wants_insert = matches!(action, OrmAction::Insert | OrmAction::Save);
        let wants_update = matches!(action, OrmAction::Update | OrmAction::Save);
        let wants_where = action != OrmAction::Insert;

        let sequence = self.keys.sequence_name_or_identity_function();
        let sequence_based = self.dialect.is_sequence_based();

        let mut states = KeyStates::new(self.keys.count());
        let mut frags = Fragments::default();
        let mut args: Vec<NameValueType> = Vec::new();
        let mut nextval_added = false;

        for (ordinal, field) in item.fields().into_iter().enumerate() {
            let (name, key) = self.resolve_field(ordinal, &field)?;

            // Nulls go into the SQL text as a literal, never as a parameter.
            let (placeholder, arg) = if field.value.is_null() {
                ("NULL".to_string(), None)
            } else {
                args.push(NameValueType::named(
                    name.clone(),
                    field.value.clone(),
                    field.declared_type,
                ));
                (self.dialect.prefix_parameter_name(&name), Some(args.len() - 1))
            };

            match key {
                Some(index) => {
                    let state = KeyState::classify(&field.value, field.declared_type);
                    states.0[index] = state;
                    if wants_insert {
                        match sequence {
                            // Defaulted keys are left to the database.
                            None if state == KeyState::DefaultValue => {}
                            None => {
                                frags.insert_names.push(name.clone());
                                frags.insert_values.push(Fragment {
                                    sql: placeholder.clone(),
                                    arg,
                                });
                            }
                            Some(seq) if sequence_based => {
                                frags.insert_names.push(name.clone());
                                frags.insert_values.push(Fragment {
                                    sql: self.dialect.build_nextval(seq),
                                    arg: None,
                                });
                                nextval_added = true;
                            }
                            // Identity columns are generated by the engine.
                            Some(_) => {}
                        }
                    }
                    if wants_where {
                        frags.where_pairs.push(Fragment {
                            sql: format!("{name} = {placeholder}"),
                            arg,
                        });
                    }
                }
                None => {
                    if wants_insert {
                        frags.insert_names.push(name.clone());
                        frags.insert_values.push(Fragment {
                            sql: placeholder.clone(),
                            arg,
                        });
                    }
                    if wants_update {
                        frags.update_pairs.push(Fragment {
                            sql: format!("{name} = {placeholder}"),
                            arg,
                        });
                    }
                }
            }
        }

        self.validate(action, &states)?;

        let resolved = match action {
            OrmAction::Save => states.resolve_save(),
            other => other,
        };

        let (sql, order): (String, Vec<&Fragment>) = match resolved {
            // Save never survives resolution.
            OrmAction::Insert | OrmAction::Save => {
                if let Some(seq) = sequence {
                    if sequence_based && !nextval_added {
                        frags.insert_names.push(self.keys.field_names());
                        frags.insert_values.push(Fragment {
                            sql: self.dialect.build_nextval(seq),
                            arg: None,
                        });
                    }
                }
                if frags.insert_names.is_empty() {
                    return Err(OrmError::configuration(format!(
                        "{action} on {}: item has no columns to insert",
                        self.table
                    )));
                }
                let mut sql = self.dialect.build_insert(
                    self.table,
                    &frags.insert_names.join(", "),
                    &join(&frags.insert_values, ", "),
                );
                if let Some(seq) = sequence {
                    let retrieve = if sequence_based {
                        self.dialect.build_currval_select(seq)
                    } else {
                        format!("SELECT {seq}")
                    };
                    sql.push_str(STATEMENT_SEPARATOR);
                    sql.push_str(&retrieve);
                    sql.push(';');
                }
                (sql, frags.insert_values.iter().collect())
            }
            OrmAction::Update => {
                self.require_keys(action, resolved, &states)?;
                if frags.update_pairs.is_empty() {
                    return Err(OrmError::configuration(format!(
                        "{action} on {}: item has no non-key columns to update",
                        self.table
                    )));
                }
                let sql = self.dialect.build_update(
                    self.table,
                    &join(&frags.update_pairs, ", "),
                    &join(&frags.where_pairs, " AND "),
                );
                let order = frags
                    .update_pairs
                    .iter()
                    .chain(frags.where_pairs.iter())
                    .collect();
                (sql, order)
            }
            OrmAction::Delete => {
                self.require_keys(action, resolved, &states)?;
                let sql = self
                    .dialect
                    .build_delete(self.table, &join(&frags.where_pairs, " AND "));
                (sql, frags.where_pairs.iter().collect())
            }
        };

        let mut command = Command::new(sql);
        let binder = ParameterBinder::new(self.dialect, self.keys);
        let mut bound = vec![false; args.len()];
        for index in order.into_iter().filter_map(|f| f.arg) {
            if std::mem::replace(&mut bound[index], true) {
                continue;
            }
            let arg = &args[index];
            let name = arg.name.as_deref().unwrap_or_default();
            binder.bind(
                &mut command,
                arg.value.clone(),
                ParamName::Named(name),
                Direction::Input,
                arg.declared_type,
            )?;
        }

        if resolved == OrmAction::Insert && sequence.is_some() {
            self.dialect.fixup_insert_command(&mut command);
        }

        Ok(ActionCommand {
            requested: action,
            action: resolved,
            command,
        })
    }

    /// All-or-nothing key presence, all-or-nothing default keys.
    fn validate(&self, action: OrmAction, states: &KeyStates) -> OrmResult<()> {
        let supplied = states.supplied();
        if supplied == 0 {
            return Ok(());
        }
        if supplied != self.keys.count() {
            return Err(OrmError::key_mismatch(format!(
                "All or no primary key fields must be present in item for {action} on {} \
                 (expected {}: {}, got {supplied})",
                self.table,
                self.keys.count(),
                self.keys.field_names(),
            )));
        }
        let defaulted = states.defaulted();
        if defaulted > 0 && defaulted != supplied {
            return Err(OrmError::key_mismatch(format!(
                "All or no primary key fields must start with their default values in item for \
                 {action} on {} ({defaulted} of {supplied} defaulted)",
                self.table
            )));
        }
        Ok(())
    }

    /// Update and Delete need a WHERE clause built from every key.
    fn require_keys(&self, action: OrmAction, resolved: OrmAction, states: &KeyStates) -> OrmResult<()> {
        if self.keys.is_empty() {
            return Err(OrmError::configuration(format!(
                "{action} on {} requires a primary key, none is configured",
                self.table
            )));
        }
        if states.supplied() == 0 {
            return Err(OrmError::key_mismatch(format!(
                "{resolved} on {} requires primary key field(s) {} in item",
                self.table,
                self.keys.field_names()
            )));
        }
        Ok(())
    }
}
