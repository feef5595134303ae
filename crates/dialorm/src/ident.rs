//! Table and column identifier handling.
//!
//! [`TableName`] is a possibly owner-qualified table name (`owner.table`).
//! The full text is used in DML; the bare name and the owner are what the
//! introspection query needs.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts use `"..."`, `[...]` or `` `...` ``, allow any character
//!   except NUL, and escape the closing delimiter by doubling it
//!
//! # Example
//! ```ignore
//! use dialorm::TableName;
//!
//! let t = TableName::parse("dbo.Users")?;
//! assert_eq!(t.owner(), Some("dbo"));
//! assert_eq!(t.bare(), "Users");
//! # Ok::<(), dialorm::OrmError>(())
//! ```

use std::fmt;

use crate::error::{OrmError, OrmResult};

/// A part of a dotted identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Unquoted identifier: must match `[A-Za-z_][A-Za-z0-9_$]*`.
    Unquoted(String),
    /// Quoted identifier, with the opening delimiter it was written with.
    Quoted { name: String, open: char },
}

impl IdentPart {
    /// The identifier with any quoting removed.
    pub fn name(&self) -> &str {
        match self {
            Self::Unquoted(s) => s,
            Self::Quoted { name, .. } => name,
        }
    }

    fn write_sql(&self, out: &mut String) {
        match self {
            Self::Unquoted(s) => out.push_str(s),
            Self::Quoted { name, open } => {
                let close = closing_delimiter(*open);
                out.push(*open);
                for ch in name.chars() {
                    if ch == close {
                        out.push(close);
                    }
                    out.push(ch);
                }
                out.push(close);
            }
        }
    }
}

fn closing_delimiter(open: char) -> char {
    match open {
        '[' => ']',
        other => other,
    }
}

fn parse_parts(s: &str) -> OrmResult<Vec<IdentPart>> {
    let s = s.trim();
    if s.is_empty() {
        return Err(OrmError::validation("Identifier cannot be empty"));
    }
    if s.contains('\0') {
        return Err(OrmError::validation(
            "Identifier cannot contain NUL character",
        ));
    }

    let mut parts = Vec::new();
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        if !parts.is_empty() {
            match chars.next() {
                Some('.') => {
                    if chars.peek().is_none() {
                        return Err(OrmError::validation("Trailing '.' in identifier"));
                    }
                }
                Some(c) => {
                    return Err(OrmError::validation(format!(
                        "Expected '.' between identifier parts, got '{c}'"
                    )));
                }
                None => break,
            }
        }

        if let Some(&open @ ('"' | '[' | '`')) = chars.peek() {
            chars.next();
            let close = closing_delimiter(open);
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == close => {
                        if chars.peek() == Some(&close) {
                            chars.next();
                            name.push(close);
                        } else {
                            break;
                        }
                    }
                    Some(c) => name.push(c),
                    None => return Err(OrmError::validation("Unclosed quoted identifier")),
                }
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty quoted identifier"));
            }
            parts.push(IdentPart::Quoted { name, open });
            continue;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '.' {
                break;
            }
            let ok = if name.is_empty() {
                c == '_' || c.is_ascii_alphabetic()
            } else {
                c == '_' || c == '$' || c.is_ascii_alphanumeric()
            };
            if !ok {
                return Err(OrmError::validation(format!(
                    "Invalid character in identifier '{s}': '{c}'"
                )));
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return Err(OrmError::validation("Empty identifier segment"));
        }
        parts.push(IdentPart::Unquoted(name));
    }

    Ok(parts)
}

/// Validate a single (undotted) column identifier.
pub(crate) fn validate_column(name: &str) -> OrmResult<()> {
    match parse_parts(name)?.as_slice() {
        [_] => Ok(()),
        _ => Err(OrmError::validation(format!(
            "Column name '{name}' cannot be dotted"
        ))),
    }
}

/// A table name, optionally qualified by its owner/schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    parts: Vec<IdentPart>,
    sql: String,
}

impl TableName {
    pub fn parse(s: &str) -> OrmResult<Self> {
        let parts = parse_parts(s)?;
        let mut sql = String::with_capacity(s.len());
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                sql.push('.');
            }
            part.write_sql(&mut sql);
        }
        Ok(Self { parts, sql })
    }

    /// Full name as written into DML.
    pub fn as_sql(&self) -> &str {
        &self.sql
    }

    /// Unqualified table name, unquoted.
    pub fn bare(&self) -> &str {
        self.parts.last().map(IdentPart::name).unwrap_or_default()
    }

    /// Owner (the part right before the table name), unquoted.
    pub fn owner(&self) -> Option<&str> {
        match self.parts.len() {
            0 | 1 => None,
            n => Some(self.parts[n - 2].name()),
        }
    }

    pub fn parts(&self) -> &[IdentPart] {
        &self.parts
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple() {
        let t = TableName::parse("Users").unwrap();
        assert_eq!(t.as_sql(), "Users");
        assert_eq!(t.bare(), "Users");
        assert_eq!(t.owner(), None);
    }

    #[test]
    fn owner_is_the_part_before_the_last_dot() {
        let t = TableName::parse("db.dbo.Users").unwrap();
        assert_eq!(t.owner(), Some("dbo"));
        assert_eq!(t.bare(), "Users");
        assert_eq!(t.to_string(), "db.dbo.Users");
    }

    #[test]
    fn quoting_styles() {
        let t = TableName::parse(r#"public."User Table""#).unwrap();
        assert_eq!(t.bare(), "User Table");
        assert_eq!(t.as_sql(), r#"public."User Table""#);

        let t = TableName::parse("[dbo].[Order]]s]").unwrap();
        assert_eq!(t.owner(), Some("dbo"));
        assert_eq!(t.bare(), "Order]s");
        assert_eq!(t.as_sql(), "[dbo].[Order]]s]");

        let t = TableName::parse("`shop`.`items`").unwrap();
        assert_eq!(t.bare(), "items");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("1table").is_err());
        assert!(TableName::parse("my table").is_err());
        assert!(TableName::parse("schema..table").is_err());
        assert!(TableName::parse("schema.").is_err());
        assert!(TableName::parse(r#""unclosed"#).is_err());
    }

    #[test]
    fn columns_are_single_parts() {
        assert!(validate_column("Name").is_ok());
        assert!(validate_column("[Order Id]").is_ok());
        assert!(validate_column("a.b").is_err());
    }
}
