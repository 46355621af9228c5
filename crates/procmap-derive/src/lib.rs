//! Derive macros for procmap
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod entity;

/// Derive the `Entity` descriptor for a struct.
///
/// # Example
///
/// ```ignore
/// use procmap::Entity;
///
/// #[derive(Debug, Default, Clone, Entity)]
/// #[orm(prefix = "u")]
/// struct User {
///     #[orm(identity, crud = "read|delete")]
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     #[orm(foreign_key = "Team.id")]
///     team_id: Option<i64>,
///     posts: Vec<Post>,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(prefix = "p")]` - Column prefix for flattened joins (default: the type name)
///
/// Field level:
/// - `#[orm(column = "name")]` - Map field to a different column / parameter name
/// - `#[orm(crud = "create|read|update|delete|dont_use|all")]` - Directions the field takes part in
/// - `#[orm(foreign_key = "field")]` or `"Type.field"` - Parent field this field must equal
/// - `#[orm(identity)]` - Database-generated identity, used to deduplicate joined rows
/// - `#[orm(readonly)]` - No setter: the field is never loaded from rows
/// - `#[orm(skip)]` - Not mapped at all
/// - `#[orm(child)]` - An `Option<C>` field holding a single child entity
/// - `#[orm(scalar)]` - Map a `Vec<String>`, `Vec<i64>` (or other primitive list) field as one
///   JSON array value instead of a child collection; wrap other types in `procmap::Json`
///
/// `Vec<C>` fields (other than `Vec<u8>`) are child collections of entity `C`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
