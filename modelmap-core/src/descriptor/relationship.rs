//! Relationship declarations.

use std::fmt;

use smol_str::SmolStr;

use super::EntityType;

/// Type of relation between entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relation (e.g., User has one Profile).
    OneToOne,
    /// One-to-many relation (e.g., Parent has many Childs).
    OneToMany,
    /// Many-to-one relation (e.g., Child belongs to Parent).
    ManyToOne,
    /// Many-to-many relation (e.g., Post has many Tags).
    ManyToMany,
}

impl RelationType {
    /// Check if this relation holds multiple entities.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Check if this relation holds at most one entity.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Parse a relation kind as written in `#[modelmap(relation = "...")]`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "one_to_one" => Some(Self::OneToOne),
            "one_to_many" => Some(Self::OneToMany),
            "many_to_one" => Some(Self::ManyToOne),
            "many_to_many" => Some(Self::ManyToMany),
            _ => None,
        }
    }
}

/// Lazily resolved target of a relationship.
///
/// A function pointer rather than a reference so that mutually referencing
/// types (Parent.childs / Child.parent) can build their descriptors lazily.
pub type TargetFn = fn() -> &'static EntityType;

/// A navigable reference to other entities.
#[derive(Clone)]
pub struct Relationship {
    /// Name of the relation (field name).
    pub name: SmolStr,
    /// Type of relation.
    pub relation_type: RelationType,
    target: TargetFn,
}

impl Relationship {
    /// Create a relationship to the type returned by `target`.
    pub fn new(name: impl Into<SmolStr>, relation_type: RelationType, target: TargetFn) -> Self {
        Self {
            name: name.into(),
            relation_type,
            target,
        }
    }

    /// Create a one-to-one relationship.
    pub fn one_to_one(name: impl Into<SmolStr>, target: TargetFn) -> Self {
        Self::new(name, RelationType::OneToOne, target)
    }

    /// Create a one-to-many relationship.
    pub fn one_to_many(name: impl Into<SmolStr>, target: TargetFn) -> Self {
        Self::new(name, RelationType::OneToMany, target)
    }

    /// Create a many-to-one relationship.
    pub fn many_to_one(name: impl Into<SmolStr>, target: TargetFn) -> Self {
        Self::new(name, RelationType::ManyToOne, target)
    }

    /// Create a many-to-many relationship.
    pub fn many_to_many(name: impl Into<SmolStr>, target: TargetFn) -> Self {
        Self::new(name, RelationType::ManyToMany, target)
    }

    /// Descriptor of the related entity type.
    pub fn target(&self) -> &'static EntityType {
        (self.target)()
    }

    /// Check if this relationship holds a list.
    pub fn is_many(&self) -> bool {
        self.relation_type.is_many()
    }
}

impl fmt::Debug for Relationship {
    // The target is not resolved here: it may still be initializing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("name", &self.name)
            .field("relation_type", &self.relation_type)
            .finish_non_exhaustive()
    }
}
