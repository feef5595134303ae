//! Provider identifier to dialect lookup.
//!
//! Built-in dialects are always present. Additional dialects linked into the
//! binary can register themselves with [`inventory::submit!`]:
//!
//! ```ignore
//! dialorm::inventory::submit! {
//!     dialorm::DialectRegistration {
//!         providers: &["oracle", "oracle.manageddataaccess.client"],
//!         constructor: || std::sync::Arc::new(MyOracleDialect),
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::{Dialect, MySqlDialect, PostgresDialect, SqlServerDialect, SqliteDialect};
use crate::error::{OrmError, OrmResult};

/// Registration entry for a dialect provided outside this crate.
pub struct DialectRegistration {
    /// Provider identifiers (matched case-insensitively).
    pub providers: &'static [&'static str],
    /// Builds the dialect instance.
    pub constructor: fn() -> Arc<dyn Dialect>,
}

inventory::collect!(DialectRegistration);

const SQLITE_PROVIDERS: &[&str] = &["sqlite", "system.data.sqlite", "microsoft.data.sqlite"];
const POSTGRES_PROVIDERS: &[&str] = &["postgresql", "postgres", "npgsql"];
const SQLSERVER_PROVIDERS: &[&str] = &[
    "sqlserver",
    "mssql",
    "system.data.sqlclient",
    "microsoft.data.sqlclient",
];
const MYSQL_PROVIDERS: &[&str] = &["mysql", "mysql.data.mysqlclient", "mysqlconnector"];

/// Maps provider identifiers to dialect instances.
#[derive(Clone, Default)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DialectRegistry {
    /// Registry with the built-in dialects and every inventory registration.
    pub fn new() -> Self {
        let mut registry = Self::new_empty();
        registry.register_all(SQLITE_PROVIDERS, Arc::new(SqliteDialect::new()));
        registry.register_all(POSTGRES_PROVIDERS, Arc::new(PostgresDialect::new()));
        registry.register_all(SQLSERVER_PROVIDERS, Arc::new(SqlServerDialect::new()));
        registry.register_all(MYSQL_PROVIDERS, Arc::new(MySqlDialect::new()));
        for reg in inventory::iter::<DialectRegistration> {
            registry.register_all(reg.providers, (reg.constructor)());
        }
        registry
    }

    /// Registry with nothing registered.
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the dialect for one provider identifier.
    pub fn register(&mut self, provider: &str, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(provider.to_ascii_lowercase(), dialect);
    }

    fn register_all(&mut self, providers: &[&str], dialect: Arc<dyn Dialect>) {
        for provider in providers {
            self.register(provider, Arc::clone(&dialect));
        }
    }

    /// Look up the dialect for `provider`.
    pub fn resolve(&self, provider: &str) -> OrmResult<Arc<dyn Dialect>> {
        self.dialects
            .get(&provider.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| OrmError::UnknownProvider(provider.to_string()))
    }

    /// Registered provider identifiers, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut providers: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        providers.sort_unstable();
        providers
    }
}

impl std::fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
