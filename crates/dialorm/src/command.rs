//! Command descriptions handed to the external executor.
//!
//! The core never executes anything. It emits a [`Command`] (SQL text plus
//! ordered bound parameters), and after execution the executor feeds output
//! parameter values and row counts back through [`Command::results`] and
//! [`append_row_count_results`].

use crate::action::OrmAction;
use crate::dialect::Dialect;
use crate::item::{Item, TaggedMap};
use crate::params::{BoundParameter, Direction};
use crate::value::Value;

/// SQL text plus ordered bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub sql: String,
    pub parameters: Vec<BoundParameter>,
    /// Set when an Output field carried the row-count sentinel.
    pub row_count_capture: bool,
}

impl Command {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
            row_count_capture: false,
        }
    }

    /// Find a bound parameter by its (prefixed) handle name.
    pub fn parameter(&self, name: &str) -> Option<&BoundParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Mutable access to a bound parameter, for executors writing outputs back.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut BoundParameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    /// Input values in binding order.
    pub fn input_values(&self) -> Vec<&Value> {
        self.parameters
            .iter()
            .filter(|p| p.direction == Direction::Input)
            .map(|p| &p.value)
            .collect()
    }

    /// Collect every non-Input parameter, keyed by its deprefixed name.
    pub fn results(&self, dialect: &dyn Dialect) -> TaggedMap {
        let mut results = TaggedMap::new();
        for p in &self.parameters {
            if p.direction == Direction::Input {
                continue;
            }
            let name = dialect.deprefix_parameter_name(&p.name);
            results.insert(name, dialect.get_value(p));
        }
        results
    }
}

/// A command built for an item action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCommand {
    /// The action the caller asked for.
    pub requested: OrmAction,
    /// The action the command performs (Save resolves to Insert or Update).
    pub action: OrmAction,
    pub command: Command,
}

impl ActionCommand {
    pub fn sql(&self) -> &str {
        &self.command.sql
    }

    pub fn parameters(&self) -> &[BoundParameter] {
        &self.command.parameters
    }
}

/// Put `row_count` into `results` for every field of `out_params` carrying
/// the row-count sentinel.
pub fn append_row_count_results(
    row_count: u64,
    out_params: Item<'_>,
    results: &mut TaggedMap,
) {
    let count = i64::try_from(row_count).unwrap_or(i64::MAX);
    for (ordinal, field) in out_params.fields().into_iter().enumerate() {
        if matches!(field.value, Value::RowCount) {
            let name = field.name.unwrap_or_else(|| ordinal.to_string());
            results.insert(name, Value::BigInt(count));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlServerDialect;

    #[test]
    fn results_skip_inputs_and_deprefix() {
        let dialect = SqlServerDialect::new();
        let mut cmd = Command::new("EXEC p @a, @b OUTPUT");
        cmd.parameters.push(BoundParameter {
            name: "@a".into(),
            value: Value::Int(1),
            ..BoundParameter::empty()
        });
        cmd.parameters.push(BoundParameter {
            name: "@b".into(),
            direction: Direction::Output,
            value: Value::Null,
            ..BoundParameter::empty()
        });

        let results = cmd.results(&dialect);
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("b"), Some(&Value::Null));
    }

    #[test]
    fn row_count_fills_sentinel_fields() {
        let out = TaggedMap::new()
            .with("affected", Value::RowCount)
            .with("other", Value::Int(0));
        let mut results = TaggedMap::new();
        append_row_count_results(3, Item::map(&out), &mut results);
        assert_eq!(results.get("affected"), Some(&Value::BigInt(3)));
        assert!(!results.contains_key("other"));
    }
}
