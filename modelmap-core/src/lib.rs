//! # modelmap-core
//!
//! Declarative serialization for ORM entities.
//!
//! This crate provides the engines behind `#[derive(Entity)]`:
//! - Field resolution: turn `fields` / `exclude` paths into the columns and
//!   relationships to emit at one level, with per-level sub-selections
//! - Serialization: walk an entity graph into nested [`Record`]s
//! - Population: assign payload values and upsert related entities with one
//!   repository fetch per relationship
//! - The deprecated `columns` / `relationships` / `recursive` / `depth`
//!   parameter set
//!
//! ## Describing an entity
//!
//! ```rust
//! use modelmap_core::{ColumnType, EntityType};
//!
//! let descriptor = EntityType::builder("Child")
//!     .primary_key("pk", ColumnType::Integer)
//!     .column("parent_pk", ColumnType::Integer)
//!     .default_exclude(["parent_pk"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.primary_key(), "pk");
//! ```
//!
//! ## Selecting fields
//!
//! Dotted paths select nested fields, `+field` extends the declared defaults:
//!
//! ```rust
//! use modelmap_core::Selection;
//!
//! let selection = Selection::only(["pk", "childs.pk"]).exclude(["childs.parent_pk"]);
//! assert!(selection.has_fields());
//! ```
//!
//! ## Values
//!
//! ```rust
//! use modelmap_core::{record, Value};
//!
//! let r = record! { "pk" => 1, "name" => "child" };
//! assert_eq!(r["pk"], Value::Int(1));
//! ```

pub mod config;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod legacy;
pub mod logging;
pub mod populate;
pub mod repository;
pub mod resolver;
pub mod selection;
pub mod serialize;
pub mod value;

#[cfg(test)]
mod fixtures;

pub use config::ModelMapConfig;
pub use descriptor::{
    Column, Computed, EntityType, EntityTypeBuilder, RelationType, Relationship,
    SerializeDefaults, Synonym,
};
pub use entity::{
    Entity, Model, RelationRef, RelationValue, Serializable, assign_column,
};
pub use error::{ErrorCode, ModelError, ModelResult};
pub use legacy::LegacyOptions;
pub use populate::{PopulateOptions, UnmatchedKeyPolicy};
pub use repository::{MemoryRepository, Repository};
pub use resolver::{CacheStats, ResolvedFields, ResolverCache};
pub use selection::Selection;
pub use serialize::{SerializeOptions, UnloadedPolicy, serialize_all};
pub use value::{
    ColumnType, ColumnValue, Geometry, Record, Value, ValueError, column_type_of,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::descriptor::{EntityType, Relationship};
    pub use crate::entity::{Entity, Model, Serializable};
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::legacy::LegacyOptions;
    pub use crate::populate::{PopulateOptions, UnmatchedKeyPolicy};
    pub use crate::repository::{MemoryRepository, Repository};
    pub use crate::selection::Selection;
    pub use crate::serialize::{SerializeOptions, UnloadedPolicy};
    pub use crate::value::{ColumnType, Record, Value};
    pub use crate::record;
}
