//! Derive macros for dialorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `Record` and `RecordMeta` for a struct.
///
/// # Example
///
/// ```ignore
/// use dialorm::Record;
///
/// #[derive(Record, Default)]
/// #[orm(table = "dbo.Users")]
/// struct User {
///     #[orm(id)]
///     user_id: i64,
///     #[orm(column = "UserName")]
///     name: String,
///     email: Option<String>,
///     #[orm(skip)]
///     cached_label: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name, optionally `owner.table` (required)
/// - `#[orm(sequence = "name")]` - Sequence name or identity function; `""` disables it
/// - `#[orm(id)]` - Mark field as (part of) the primary key
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Leave field out of the item entirely
///
/// Every mapped field type must implement `ToValue`, `FromValue` and `SqlTyped`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
