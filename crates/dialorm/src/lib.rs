//! # dialorm
//!
//! A dialect-agnostic write-path core for relational databases.
//!
//! ## Features
//!
//! - **Dialect plugins**: SQL Server, PostgreSQL, MySQL and SQLite, resolved by provider name
//! - **Save resolution**: insert-or-update decided from the item's primary key values
//! - **Generated keys**: sequences (`nextval`) or identity retrieval appended to inserts
//! - **Typed nulls**: null parameters keep the storage type of their declared type
//! - **Once-only metadata**: column metadata is loaded once per table, thread-safe
//! - **No execution**: commands are plain values; bring your own connection
//!
//! ## Building commands
//!
//! ```ignore
//! use dialorm::{DialectRegistry, OrmAction, Table, TableConfig, TaggedMap};
//!
//! let registry = DialectRegistry::new();
//! let users = Table::from_registry(
//!     &TableConfig::new("Users").provider("sqlite").keys("Id"),
//!     &registry,
//! )?;
//!
//! let item = TaggedMap::new().with("Name", "alice");
//! let cmd = users.action_command(OrmAction::Save, &item)?;
//! assert_eq!(cmd.action, OrmAction::Insert);
//! // INSERT INTO Users (Name) VALUES (@Name);
//! // SELECT LAST_INSERT_ROWID();
//! ```
//!
//! ## Records
//!
//! ```ignore
//! use dialorm::Record;
//!
//! #[derive(Record, Default)]
//! #[orm(table = "users", sequence = "users_id_seq")]
//! struct User {
//!     #[orm(id)]
//!     id: i64,
//!     name: String,
//! }
//! ```

pub mod action;
pub mod command;
pub mod config;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod item;
pub mod keys;
pub mod metadata;
pub mod params;
pub mod table;
pub mod trace;
pub mod types;
pub mod value;

pub use action::{
    ActionCommandBuilder, KeyState, KeyStates, OrmAction, UpsertOutcome, upsert_item_pk,
};
pub use command::{ActionCommand, Command, append_row_count_results};
pub use config::TableConfig;
pub use dialect::{
    Dialect, DialectRegistration, DialectRegistry, MySqlDialect, PostgresDialect, SqlServerDialect,
    SqliteDialect, TableInfoQuery,
};
pub use error::{OrmError, OrmResult};
pub use ident::{IdentPart, TableName};
pub use item::{Item, ItemMut, NameValueType, Record, RecordMeta, TaggedMap};
pub use keys::{PrimaryKeyDescriptor, SequenceSetting};
pub use metadata::{CacheState, ColumnDescriptor, TableInfoSource, TableMetadataCache};
pub use params::{BoundParameter, Direction, KeyFilter, ParamName, ParameterBinder};
pub use table::{CommandParams, Table, WhereSpec};
pub use trace::SqlTrace;
pub use types::SqlType;
pub use value::{FromValue, SqlTyped, ToValue, Value};

#[cfg(feature = "derive")]
pub use dialorm_derive::Record;

// Re-exported for `inventory::submit!` dialect registrations.
pub use inventory;
