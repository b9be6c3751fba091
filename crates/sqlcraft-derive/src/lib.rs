//! Derive macros for sqlcraft
//!
//! Provides `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_row;

/// Derive `FromRow` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use sqlcraft::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     #[sql(column = "email_address")]
///     email: Option<String>,
///     #[sql(skip)]
///     cached_score: f64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[sql(column = "name")]` - Map field to a different column name
/// - `#[sql(skip)]` - Do not read the field; fill it with `Default::default()`
///
/// The generated impl also lists the mapped columns in
/// `FromRow::COLUMNS`, so `select(User::COLUMNS)` selects exactly them.
#[proc_macro_derive(FromRow, attributes(sql))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
