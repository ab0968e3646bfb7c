//! Entity type descriptors.
//!
//! A descriptor is the explicit, constructed counterpart of an ORM mapper: it
//! lists the columns, synonyms, computed properties and relationships of one
//! entity type, its primary key, its serialization defaults and hooks.
//! Descriptors are usually produced by `#[derive(Entity)]`, but can be built
//! by hand with [`EntityType::builder`].

mod column;
mod entity_type;
mod relationship;

pub use column::{Column, Computed, Synonym};
pub use entity_type::{EntityType, EntityTypeBuilder, Factory, PostProcess, SerializeDefaults};
pub use relationship::{RelationType, Relationship, TargetFn};
