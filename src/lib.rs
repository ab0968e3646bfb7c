//! # modelmap
//!
//! Declarative, field-selecting serialization for ORM entities, and the
//! reverse: populating entities from nested payloads while upserting their
//! related entities.
//!
//! modelmap provides:
//! - `#[derive(Entity)]` to describe columns, synonyms, computed properties
//!   and relationships of a struct
//! - `as_dict` / `as_dict_with` to serialize an entity graph into nested
//!   records, driven by dotted `fields` / `exclude` paths
//! - `from_dict` / `from_json` to assign payload values, matching nested
//!   items to existing records by primary key with one fetch per relationship
//!
//! ## Quick Start
//!
//! ```rust
//! use modelmap::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! struct Parent {
//!     #[modelmap(primary_key)]
//!     pk: i64,
//!     #[modelmap(relation)]
//!     childs: Vec<Child>,
//! }
//!
//! #[derive(Debug, Default, Entity)]
//! #[modelmap(exclude("parent_pk"))]
//! struct Child {
//!     #[modelmap(primary_key)]
//!     pk: i64,
//!     parent_pk: Option<i64>,
//!     #[modelmap(relation)]
//!     parent: Option<Box<Parent>>,
//! }
//!
//! let parent = Parent {
//!     pk: 1,
//!     childs: vec![Child { pk: 2, parent_pk: Some(1), parent: None }],
//! };
//!
//! let record = parent
//!     .as_dict_with(&SerializeOptions::new().fields(["childs"]))
//!     .unwrap();
//! assert_eq!(
//!     record,
//!     record! {
//!         "pk" => 1,
//!         "childs" => vec![Value::Record(record! { "pk" => 2 })],
//!     }
//! );
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use modelmap_core::*;

// Re-export proc macros
pub use modelmap_codegen::Entity;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use modelmap_core::prelude::*;

    pub use crate::Entity;
}
