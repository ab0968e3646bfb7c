//! Procedural macros for modelmap.
//!
//! # Macros
//!
//! - [`Entity`] - Derive `modelmap::Entity` and `modelmap::Model` for a struct
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Debug, Default, modelmap::Entity)]
//! #[modelmap(exclude("parent_pk"))]
//! struct Child {
//!     #[modelmap(primary_key)]
//!     pk: i64,
//!     parent_pk: Option<i64>,
//!     #[modelmap(relation)]
//!     parent: Option<Box<Parent>>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod derive;
mod types;

/// Derive macro describing an entity to the modelmap engines.
///
/// The struct must implement `Default`: population creates new related
/// entities through it.
///
/// # Attributes
///
/// ## Struct-level
/// - `#[modelmap(name = "Name")]` - Entity name used in error messages (default: struct name)
/// - `#[modelmap(fields("a", "b.c"))]` - Fields serialized when the caller selects none
/// - `#[modelmap(exclude("a"))]` - Fields excluded when the caller excludes none
/// - `#[modelmap(stringify = false)]` - Keep temporal values typed by default
/// - `#[modelmap(post_process = path)]` - `fn(&dyn Entity, Record) -> Record` applied to every record
/// - `#[modelmap(computed(method, ...))]` - Read-only properties backed by `fn(&self) -> T`
///
/// ## Field-level
/// - `#[modelmap(primary_key)]` - Mark the primary key (exactly one)
/// - `#[modelmap(rename = "name")]` - Expose the attribute under another name
/// - `#[modelmap(synonym = "alias")]` - Declare an alias of this column
/// - `#[modelmap(relation)]` - Relationship to another entity; `Vec<T>` is one-to-many,
///   `Option<Box<T>>` and `Option<T>` are many-to-one; `Option<Vec<T>>` is a one-to-many
///   that reports itself unloaded while `None`
/// - `#[modelmap(relation = "many_to_many")]` - Relationship with an explicit kind
/// - `#[modelmap(skip)]` - Not an attribute
///
/// Every other field is a column and its type must implement `modelmap::ColumnValue`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default, modelmap::Entity)]
/// #[modelmap(fields("pk", "childs"), computed(label))]
/// struct Parent {
///     #[modelmap(primary_key)]
///     pk: i64,
///
///     #[modelmap(synonym = "title")]
///     name: String,
///
///     #[modelmap(relation)]
///     childs: Vec<Child>,
/// }
///
/// impl Parent {
///     fn label(&self) -> String {
///         format!("{} ({})", self.name, self.childs.len())
///     }
/// }
/// ```
#[proc_macro_derive(Entity, attributes(modelmap))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive::derive_entity_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
