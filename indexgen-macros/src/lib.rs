use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod parsed;

use parsed::ParsedEntity;

/// Derives `indexgen::IndexEntity` for a struct with named fields.
///
/// ```text
/// #[derive(IndexEntity)]
/// #[index(display_name = "book")]
/// struct Book {
///     #[index(primary_key)]
///     id: i64,
///     title: String,
///     #[index(decimal(precision = 9, scale = 2))]
///     price: Option<f64>,
///     #[index(relation(belongs_to = Author))]
///     author: i64,
///     #[index(relation(has_many = Chapter))]
///     chapters: Vec<Chapter>,
///     #[index(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// Storage types are inferred from the Rust type (`Option<T>` marks the field
/// nullable) and can be overridden with `#[index(storage = "email")]`.
#[proc_macro_derive(IndexEntity, attributes(index))]
pub fn derive_index_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedEntity::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
