//! Column, synonym and computed property declarations.

use smol_str::SmolStr;

use crate::value::ColumnType;

/// A persisted attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Attribute name.
    pub name: SmolStr,
    /// Type tag, selects the serializer.
    pub column_type: ColumnType,
    /// Whether this column is the primary key.
    pub primary_key: bool,
}

impl Column {
    /// Create a regular column.
    pub fn new(name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
        }
    }

    /// Create the primary key column.
    pub fn primary_key(name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: true,
        }
    }
}

/// An alias of an existing column.
///
/// Reading a synonym reads its target; assigning it assigns the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synonym {
    /// Alias name.
    pub name: SmolStr,
    /// Name of the aliased column.
    pub target: SmolStr,
}

impl Synonym {
    /// Create a synonym of `target`.
    pub fn new(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }
}

/// A read-only derived property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computed {
    /// Property name.
    pub name: SmolStr,
    /// Type tag of the computed value.
    pub column_type: ColumnType,
}

impl Computed {
    /// Create a computed property.
    pub fn new(name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}
