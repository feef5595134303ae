//! Bound parameters and the parameter binder.
//!
//! The binder turns name/value/type/direction tuples into dialect-correct
//! [`BoundParameter`]s on a [`Command`]: names are prefixed by the dialect,
//! nulls get their storage type inferred from the declared type, cursor
//! sentinels go through the dialect's cursor support, and the row-count
//! sentinel is recorded on the command instead of being bound.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::item::Item;
use crate::keys::PrimaryKeyDescriptor;
use crate::types::SqlType;
use crate::value::Value;

/// Parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// How a parameter is named on a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamName<'a> {
    /// Named after the field/column; prefixed by the dialect.
    Named(&'a str),
    /// Named by its ordinal on the command (`0`, `1`, ...).
    Ordinal,
    /// Positional, unnamed parameter (dialect support required).
    Anonymous,
}

/// A parameter handle as it will be handed to the executor.
///
/// `db_type` and `size` model the storage metadata a driver infers from a
/// value; they stay put when the value is later replaced by null.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub name: String,
    pub direction: Direction,
    pub value: Value,
    pub db_type: Option<SqlType>,
    pub size: Option<usize>,
    pub anonymous: bool,
}

impl BoundParameter {
    pub(crate) fn empty() -> Self {
        Self {
            name: String::new(),
            direction: Direction::Input,
            value: Value::Null,
            db_type: None,
            size: None,
            anonymous: false,
        }
    }

    /// Whether this parameter is a typed null (null value with inferred type).
    pub fn is_typed_null(&self) -> bool {
        self.value.is_null() && self.db_type.is_some()
    }
}

/// Which fields of an item [`ParameterBinder::bind_named`] binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFilter {
    #[default]
    All,
    KeysOnly,
    NoKeys,
}

/// Binds values onto commands for one dialect and key set.
///
/// Holds no mutable state; every call works on the command it is given.
#[derive(Clone, Copy)]
pub struct ParameterBinder<'a> {
    dialect: &'a dyn Dialect,
    keys: &'a PrimaryKeyDescriptor,
}

impl<'a> ParameterBinder<'a> {
    pub fn new(dialect: &'a dyn Dialect, keys: &'a PrimaryKeyDescriptor) -> Self {
        Self { dialect, keys }
    }

    /// Bind one value onto `command`.
    pub fn bind(
        &self,
        command: &mut Command,
        value: Value,
        name: ParamName<'_>,
        direction: Direction,
        declared_type: Option<SqlType>,
    ) -> OrmResult<()> {
        let mut p = BoundParameter::empty();
        match name {
            ParamName::Anonymous => {
                if !self.dialect.set_anonymous_parameter(&mut p) {
                    return Err(OrmError::parameter_capability(
                        format!("#{}", command.parameters.len()),
                        format!(
                            "the {} dialect does not support anonymous parameters",
                            self.dialect.name()
                        ),
                    ));
                }
            }
            ParamName::Named(raw) => p.name = self.dialect.parameter_handle_name(raw),
            ParamName::Ordinal => {
                p.name = self
                    .dialect
                    .parameter_handle_name(&command.parameters.len().to_string())
            }
        }
        self.dialect.set_direction(&mut p, direction);

        match value {
            Value::Null => {
                if let Some(ty) = declared_type {
                    // Let the dialect infer storage type/size from the zero value,
                    // then keep that metadata when the value becomes null.
                    self.dialect.set_value(&mut p, ty.default_value());
                } else if direction != Direction::Input && !self.dialect.ignores_output_types(&p)
                {
                    return Err(OrmError::parameter_capability(
                        p.name.clone(),
                        format!(
                            "on the {} dialect all output, input-output and return parameters \
                             require a non-null value or a declared type, to allow the SQL \
                             parameter type to be inferred",
                            self.dialect.name()
                        ),
                    ));
                }
                p.value = Value::Null;
            }
            Value::Cursor(cursor) => {
                if !self.dialect.set_cursor(&mut p, cursor) {
                    return Err(OrmError::parameter_capability(
                        p.name.clone(),
                        format!("the {} dialect does not support cursors", self.dialect.name()),
                    ));
                }
            }
            Value::RowCount if direction == Direction::Output => {
                command.row_count_capture = true;
                return Ok(());
            }
            Value::RowCount => {
                return Err(OrmError::RowCountMisuse {
                    parameter: p.name,
                    direction,
                });
            }
            other => self.dialect.set_value(&mut p, other),
        }

        command.parameters.push(p);
        Ok(())
    }

    /// Bind positional arguments, named by their ordinal on the command.
    pub fn bind_args(&self, command: &mut Command, args: &[Value]) -> OrmResult<()> {
        for value in args {
            let declared = value.sql_type();
            self.bind(command, value.clone(), ParamName::Ordinal, Direction::Input, declared)?;
        }
        Ok(())
    }

    /// Bind every field of `source` as a named parameter.
    ///
    /// A row-count sentinel on an Output field marks the command as carrying
    /// a row-count capture instead of binding anything. Returns whether such
    /// a capture was found.
    pub fn bind_named(
        &self,
        command: &mut Command,
        source: Item<'_>,
        direction: Direction,
        filter: KeyFilter,
    ) -> OrmResult<bool> {
        let mut row_count = false;
        for (ordinal, field) in source.fields().into_iter().enumerate() {
            let name = match field.name {
                Some(name) => name,
                None => ordinal.to_string(),
            };
            let keep = match filter {
                KeyFilter::All => true,
                KeyFilter::KeysOnly => self.keys.is_key(&name).is_some(),
                KeyFilter::NoKeys => self.keys.is_key(&name).is_none(),
            };
            if !keep {
                continue;
            }
            if matches!(field.value, Value::RowCount) {
                if direction != Direction::Output {
                    return Err(OrmError::RowCountMisuse {
                        parameter: name,
                        direction,
                    });
                }
                row_count = true;
                continue;
            }
            self.bind(
                command,
                field.value,
                ParamName::Named(&name),
                direction,
                field.declared_type,
            )?;
        }
        command.row_count_capture |= row_count;
        Ok(row_count)
    }
}
