//! Deprecated serialization parameters.
//!
//! Older callers select columns and relationships in separate lists and ask
//! for recursion with a `recursive` flag and an optional `depth`. These are
//! lowered into a [`Selection`] plus a [`Recursion`] state carried down the
//! walk: every level appends its own type to the visited list and, while the
//! depth allows it, adds each relationship leading to a type not visited yet.

use std::collections::BTreeSet;

use tracing::warn;

use crate::descriptor::EntityType;
use crate::selection::Selection;
use crate::serialize::SerializeOptions;

/// Serialization options including the deprecated parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyOptions {
    /// Current options; `columns` and `relationships` are added to its fields.
    pub base: SerializeOptions,
    /// Columns to serialize.
    pub columns: Vec<String>,
    /// Relationships to serialize.
    pub relationships: Vec<String>,
    /// Follow every relationship, avoiding types already visited.
    pub recursive: bool,
    /// Maximum recursion depth. A positive depth implies `recursive`.
    pub depth: Option<u32>,
}

impl LegacyOptions {
    /// Options using every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from current options.
    pub fn with_base(base: SerializeOptions) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    /// Set the columns list.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the relationships list.
    pub fn relationships(mut self, relationships: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.relationships = relationships.into_iter().map(Into::into).collect();
        self
    }

    /// Enable unbounded recursion.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Limit recursion depth.
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Check if recursion is requested.
    pub fn is_recursive(&self) -> bool {
        self.recursive || self.depth.is_some_and(|d| d > 0)
    }

    /// Lower into the top-level selection and the recursion state.
    pub(crate) fn lower(&self) -> (Selection, Option<Recursion>) {
        let mut selection = self.base.selection.clone();

        if !self.columns.is_empty() {
            warn!(
                target: "modelmap::deprecation",
                "'columns' argument is deprecated. Please add columns to serialize directly in 'fields' argument."
            );
            let fields = selection.fields.get_or_insert_with(BTreeSet::new);
            fields.extend(self.columns.iter().cloned());
        }
        if !self.relationships.is_empty() {
            warn!(
                target: "modelmap::deprecation",
                "'relationships' argument is deprecated. Please add relationships to serialize directly in 'fields' argument."
            );
            let fields = selection.fields.get_or_insert_with(BTreeSet::new);
            fields.extend(self.relationships.iter().cloned());
        }

        let recursion = if self.is_recursive() {
            warn!(
                target: "modelmap::deprecation",
                "'recursive' argument is deprecated. Please add relationships to serialize directly in 'fields' argument."
            );
            Some(Recursion::new(self.depth))
        } else {
            None
        };

        (selection, recursion)
    }
}

/// Recursion state inherited by nested levels.
#[derive(Debug, Clone, Default)]
pub struct Recursion {
    depth: Option<u32>,
    visited: Vec<&'static EntityType>,
}

impl Recursion {
    /// Start recursing, optionally bounded by `depth`.
    pub fn new(depth: Option<u32>) -> Self {
        Self {
            depth,
            visited: Vec::new(),
        }
    }

    /// Remaining depth, `None` when unbounded.
    pub fn depth(&self) -> Option<u32> {
        self.depth
    }

    /// Check if a type was visited on the way down.
    pub fn has_visited(&self, entity_type: &EntityType) -> bool {
        self.visited.iter().any(|v| v.is(entity_type))
    }

    /// Enter a level of type `entity_type`.
    ///
    /// Returns the selection to resolve at this level and the state to pass
    /// to its relationships.
    pub fn descend(
        mut self,
        entity_type: &'static EntityType,
        mut selection: Selection,
    ) -> (Selection, Recursion) {
        self.visited.push(entity_type);

        if self.depth.is_none_or(|d| d > 0) {
            let fields = selection.fields.get_or_insert_with(BTreeSet::new);
            let extra: Vec<String> = entity_type
                .relationships()
                .iter()
                .filter(|r| !fields.contains(r.name.as_str()))
                .filter(|r| !self.has_visited(r.target()))
                .map(|r| r.name.to_string())
                .collect();
            fields.extend(extra);
            if let Some(depth) = self.depth.as_mut() {
                *depth -= 1;
            }
        }

        (selection, self)
    }
}
