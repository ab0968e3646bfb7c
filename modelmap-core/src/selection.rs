//! Field selections: which attributes and relationships to serialize.
//!
//! Paths use a dotted notation: `"pk"` names a direct attribute, `"b"` a
//! relationship, `"b.a.pk"` a field of an entity reached through `b` then `a`.
//! A leading `+` (`"+label"`) adds a field to the declared defaults instead of
//! replacing them.
//!
//! ```rust
//! use modelmap_core::Selection;
//!
//! let selection = Selection::new()
//!     .fields(["pk", "b.pk", "b.a"])
//!     .exclude(["b.a.name"]);
//!
//! assert!(selection.has_fields());
//! assert!(selection.is_excluded("b.a.name"));
//! ```

use std::collections::BTreeSet;

/// The `(fields, exclude)` pair of a serialization request.
///
/// `None` and an empty set are distinct: `None` means "use the declared
/// defaults", an empty set bypasses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Requested fields.
    pub fields: Option<BTreeSet<String>>,
    /// Excluded fields.
    pub exclude: Option<BTreeSet<String>>,
}

impl Selection {
    /// A selection that uses the declared defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select only the given fields.
    pub fn only(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new().fields(fields)
    }

    /// Set the requested fields, replacing any previous set.
    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Add one requested field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.get_or_insert_with(BTreeSet::new).insert(name.into());
        self
    }

    /// Set the excluded fields, replacing any previous set.
    pub fn exclude(mut self, exclude: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude = Some(exclude.into_iter().map(Into::into).collect());
        self
    }

    /// Add one excluded field.
    pub fn excluding(mut self, name: impl Into<String>) -> Self {
        self.exclude.get_or_insert_with(BTreeSet::new).insert(name.into());
        self
    }

    /// Check if fields were given, even an empty set.
    pub fn has_fields(&self) -> bool {
        self.fields.is_some()
    }

    /// Check if an exclude set was given, even an empty one.
    pub fn has_exclude(&self) -> bool {
        self.exclude.is_some()
    }

    /// Check if `path` is in the given exclude set.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.as_ref().is_some_and(|e| e.contains(path))
    }

    /// Check if both parts use the declared defaults.
    pub fn is_default(&self) -> bool {
        self.fields.is_none() && self.exclude.is_none()
    }
}

/// First segment of a dotted path.
#[inline]
pub fn first_segment(path: &str) -> &str {
    path.split_once('.').map_or(path, |(head, _)| head)
}

/// Check if a path traverses a relationship.
#[inline]
pub fn is_nested(path: &str) -> bool {
    path.contains('.')
}

/// Paths below `name`, with the `"name."` prefix stripped.
///
/// Returns `None` when no path starts with the prefix, so the nested entity
/// falls back to its own defaults.
pub fn sub_paths(paths: &BTreeSet<String>, name: &str) -> Option<BTreeSet<String>> {
    let nested: BTreeSet<String> = paths
        .iter()
        .filter_map(|path| {
            path.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(str::to_string)
        })
        .collect();
    if nested.is_empty() { None } else { Some(nested) }
}
