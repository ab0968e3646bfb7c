//! Field resolution and its per-type cache.
//!
//! [`resolve`] turns a [`Selection`] into the concrete list of columns and
//! relationships to emit for one entity type, with the sub-selection to pass
//! to each relationship. The result only depends on the type and the
//! selection, so every descriptor memoizes it in a [`ResolverCache`].
//!
//! ```rust,ignore
//! let resolved = Child::descriptor().resolve(&Selection::only(["pk", "parent"]))?;
//! assert_eq!(resolved.column_names(), vec!["pk"]);
//! assert_eq!(resolved.relationship_names(), vec!["parent"]);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::descriptor::EntityType;
use crate::error::{ModelError, ModelResult};
use crate::selection::{Selection, first_segment, is_nested, sub_paths};
use crate::value::{ColumnType, ValueSerializer};

/// A column, synonym or computed property to emit.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    /// Key in the produced record.
    pub name: SmolStr,
    /// Attribute read on the entity (the target column for synonyms).
    pub source: SmolStr,
    /// Type of the attribute.
    pub column_type: ColumnType,
    /// Serializer applied when stringification is on.
    pub serializer: Option<ValueSerializer>,
}

// The serializer follows from the column type; function pointers are not
// compared.
impl PartialEq for ResolvedColumn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.source == other.source
            && self.column_type == other.column_type
    }
}

/// A relationship to traverse.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelationship {
    /// Relationship name.
    pub name: SmolStr,
    /// Whether the relationship holds a list.
    pub many: bool,
    /// Selection passed to the related entities.
    pub selection: Selection,
}

/// The outcome of resolving a selection against an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFields {
    /// Effective field set.
    pub fields: BTreeSet<String>,
    /// Effective exclude set.
    pub exclude: BTreeSet<String>,
    /// Columns to emit, in declaration order.
    pub columns: Vec<ResolvedColumn>,
    /// Relationships to traverse, in declaration order.
    pub relationships: Vec<ResolvedRelationship>,
}

impl ResolvedFields {
    /// Names of the emitted columns.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of the traversed relationships.
    pub fn relationship_names(&self) -> Vec<&str> {
        self.relationships.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Resolve a selection against an entity type, without caching.
pub fn resolve(entity_type: &EntityType, selection: &Selection) -> ModelResult<ResolvedFields> {
    let defaults = entity_type.defaults();
    let mut working_exclude = defaults.exclude.clone();

    let fields = match &selection.fields {
        None => defaults.fields.clone(),
        Some(requested) if requested.is_empty() => BTreeSet::new(),
        Some(requested) => {
            let mut base = BTreeSet::new();
            let mut additional = BTreeSet::new();
            let mut relationship = BTreeSet::new();

            for field in requested {
                let name = if entity_type.is_relationship(first_segment(field)) {
                    relationship.insert(field.clone());
                    field.as_str()
                } else if let Some(stripped) = field.strip_prefix('+') {
                    let stripped = stripped.trim_start_matches('+');
                    additional.insert(stripped.to_string());
                    stripped
                } else {
                    base.insert(field.clone());
                    field.as_str()
                };
                working_exclude.remove(name);
            }

            if !base.is_empty() {
                base.into_iter().chain(additional).chain(relationship).collect()
            } else if defaults
                .fields
                .iter()
                .any(|f| !entity_type.is_relationship(first_segment(f)))
            {
                // Defaults name columns: extend them.
                defaults
                    .fields
                    .iter()
                    .cloned()
                    .chain(additional)
                    .chain(relationship)
                    .collect()
            } else {
                // Defaults only name relationships: keep all columns.
                defaults.fields.iter().cloned().chain(relationship).collect()
            }
        }
    };

    let exclude = selection.exclude.clone().unwrap_or(working_exclude);

    validate(entity_type, &fields)?;

    let candidates = entity_type
        .columns()
        .iter()
        .map(|c| (&c.name, &c.name, c.column_type))
        .chain(entity_type.synonyms().iter().filter_map(|s| {
            entity_type
                .column(&s.target)
                .map(|target| (&s.name, &target.name, target.column_type))
        }))
        .chain(
            entity_type
                .computed()
                .iter()
                .map(|c| (&c.name, &c.name, c.column_type)),
        )
        .map(|(name, source, column_type)| ResolvedColumn {
            name: name.clone(),
            source: source.clone(),
            column_type,
            serializer: column_type.serializer(),
        });

    let all: Vec<ResolvedColumn> = candidates.collect();
    let selected: Vec<ResolvedColumn> = all
        .iter()
        .filter(|c| fields.contains(c.name.as_str()))
        .cloned()
        .collect();
    let pool = if selected.is_empty() { all } else { selected };
    let columns = pool
        .into_iter()
        .filter(|c| !exclude.contains(c.name.as_str()))
        .filter(|c| !c.column_type.is_geometry())
        .collect();

    let first_level: BTreeSet<&str> = fields.iter().map(|f| first_segment(f)).collect();
    let relationships = entity_type
        .relationships()
        .iter()
        .filter(|r| first_level.contains(r.name.as_str()))
        .filter(|r| !exclude.contains(r.name.as_str()))
        .map(|r| ResolvedRelationship {
            name: r.name.clone(),
            many: r.is_many(),
            selection: Selection {
                fields: sub_paths(&fields, &r.name),
                exclude: sub_paths(&exclude, &r.name),
            },
        })
        .collect();

    Ok(ResolvedFields {
        fields,
        exclude,
        columns,
        relationships,
    })
}

fn validate(entity_type: &EntityType, fields: &BTreeSet<String>) -> ModelResult<()> {
    for field in fields.iter().filter(|f| !is_nested(f)) {
        if !entity_type.has_attribute(field) && !entity_type.is_relationship(field) {
            return Err(ModelError::unknown_field(entity_type.name(), field.as_str()));
        }
    }
    for field in fields.iter().filter(|f| is_nested(f)) {
        let head = first_segment(field);
        if !entity_type.is_relationship(head) {
            return Err(ModelError::unknown_relationship(entity_type.name(), head));
        }
    }
    Ok(())
}

/// Statistics about resolver cache usage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of cached selections.
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the hit rate.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe memo of resolved selections for one entity type.
///
/// Entries are never evicted: the number of distinct selections an
/// application uses is bounded by its code. Errors are not cached.
#[derive(Debug, Default)]
pub struct ResolverCache {
    entries: RwLock<HashMap<Selection, Arc<ResolvedFields>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolverCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached resolution or compute and store it.
    ///
    /// The computation runs outside the lock; concurrent misses on the same
    /// selection may both compute, the last insert wins.
    pub fn get_or_resolve(
        &self,
        entity_type: &EntityType,
        selection: &Selection,
    ) -> ModelResult<Arc<ResolvedFields>> {
        if let Some(resolved) = self.entries.read().get(selection) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(resolved));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(
            entity = entity_type.name(),
            fields = ?selection.fields,
            exclude = ?selection.exclude,
            "ResolverCache miss"
        );

        let resolved = Arc::new(resolve(entity_type, selection)?);
        self.entries
            .write()
            .insert(selection.clone(), Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Check if a selection is cached.
    pub fn contains(&self, selection: &Selection) -> bool {
        self.entries.read().contains_key(selection)
    }

    /// Get the number of cached selections.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached selection.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Reset cache statistics.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Model;
    use crate::error::ErrorCode;
    use crate::fixtures::{A, B, C, Child, Parent, Tagged, U, V};
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_selection_emits_all_columns() {
        let resolved = resolve(Child::descriptor(), &Selection::new()).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk", "parent_pk"]);
        assert!(resolved.relationships.is_empty());
    }

    #[test]
    fn test_base_fields_restrict_columns() {
        let resolved = resolve(C::descriptor(), &Selection::only(["pk", "b"])).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk"]);
        assert_eq!(resolved.relationship_names(), vec!["b"]);
        assert_eq!(resolved.relationships[0].selection, Selection::new());
    }

    #[test]
    fn test_relationship_only_fields_keep_all_columns() {
        let resolved = resolve(
            C::descriptor(),
            &Selection::only(["b.c_set.b", "b.c_set.pk"]),
        )
        .unwrap();
        assert_eq!(resolved.column_names(), vec!["pk", "b_pk"]);
        assert_eq!(
            resolved.relationships[0].selection.fields,
            Some(set(&["c_set.b", "c_set.pk"]))
        );
    }

    #[test]
    fn test_nested_exclude_is_scoped() {
        let selection = Selection::only(["b", "b.c_set"]).exclude(["b_pk", "b.a_pk", "b.c_set.pk"]);
        let resolved = resolve(C::descriptor(), &selection).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk"]);
        let sub = &resolved.relationships[0].selection;
        assert_eq!(sub.fields, Some(set(&["c_set"])));
        assert_eq!(sub.exclude, Some(set(&["a_pk", "c_set.pk"])));
    }

    #[test]
    fn test_declared_defaults() {
        let u = resolve(U::descriptor(), &Selection::new()).unwrap();
        assert_eq!(u.column_names(), vec!["pk"]);
        assert_eq!(u.relationship_names(), vec!["v_set"]);

        let v = resolve(V::descriptor(), &Selection::new()).unwrap();
        assert_eq!(v.column_names(), vec!["pk"]);
        assert_eq!(v.exclude, set(&["u_pk"]));
    }

    #[test]
    fn test_empty_fields_bypass_defaults() {
        let resolved = resolve(U::descriptor(), &Selection::only(Vec::<String>::new())).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk"]);
        assert!(resolved.relationships.is_empty());
    }

    #[test]
    fn test_empty_exclude_replaces_default_exclude() {
        let resolved = resolve(V::descriptor(), &Selection::new().exclude(Vec::<String>::new())).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk", "u_pk"]);
    }

    #[test]
    fn test_requesting_excluded_field_overrides_default_exclude() {
        let resolved = resolve(V::descriptor(), &Selection::only(["pk", "u_pk"])).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk", "u_pk"]);
        assert!(resolved.exclude.is_empty());
    }

    #[test]
    fn test_additional_fields_extend_column_defaults() {
        let resolved = resolve(Tagged::descriptor(), &Selection::only(["+label"])).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk", "label"]);
        assert_eq!(resolved.fields, set(&["label", "pk"]));
    }

    #[test]
    fn test_additional_fields_dropped_when_defaults_are_relationships() {
        let resolved = resolve(U::descriptor(), &Selection::only(["+pk"])).unwrap();
        assert_eq!(resolved.fields, set(&["v_set"]));
        assert_eq!(resolved.column_names(), vec!["pk"]);
    }

    #[test]
    fn test_multiple_plus_are_stripped() {
        let resolved = resolve(Tagged::descriptor(), &Selection::only(["++label"])).unwrap();
        assert!(resolved.fields.contains("label"));
    }

    #[test]
    fn test_synonyms_and_computed_follow_columns() {
        let resolved = resolve(Tagged::descriptor(), &Selection::only(Vec::<String>::new())).unwrap();
        assert_eq!(
            resolved.column_names(),
            vec!["pk", "name", "created", "label", "title", "display"]
        );
        let title = &resolved.columns[4];
        assert_eq!(title.source, "name");
        assert!(title.serializer.is_none());
    }

    #[test]
    fn test_resolved_columns_compare_by_attribute() {
        let first = resolve(Tagged::descriptor(), &Selection::only(["pk", "created"])).unwrap();
        let second = resolve(Tagged::descriptor(), &Selection::only(["created", "pk"])).unwrap();
        assert_eq!(first.columns, second.columns);
        assert_ne!(first.columns[0], first.columns[1]);
    }

    #[test]
    fn test_geometry_is_never_resolved() {
        let resolved = resolve(Tagged::descriptor(), &Selection::only(["pk", "shape"])).unwrap();
        assert_eq!(resolved.column_names(), vec!["pk"]);
    }

    #[test]
    fn test_unknown_field() {
        let err = resolve(Parent::descriptor(), &Selection::only(["unexisting"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownField);
        assert!(err.message.contains("does not exist on Parent"));
    }

    #[test]
    fn test_unknown_relationship() {
        let err = resolve(Parent::descriptor(), &Selection::only(["pk.unexisting"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownRelationship);
        assert_eq!(err.message, "Relationship 'pk' does not exist on Parent.");
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let cache = ResolverCache::new();
        let selection = Selection::only(["pk", "a"]);

        let first = cache.get_or_resolve(B::descriptor(), &selection).unwrap();
        let second = cache.get_or_resolve(B::descriptor(), &selection).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_does_not_store_errors() {
        let cache = ResolverCache::new();
        let selection = Selection::only(["nope"]);
        assert!(cache.get_or_resolve(A::descriptor(), &selection).is_err());
        assert!(cache.get_or_resolve(A::descriptor(), &selection).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_cache_key_distinguishes_empty_from_none() {
        let cache = ResolverCache::new();
        cache.get_or_resolve(U::descriptor(), &Selection::new()).unwrap();
        cache
            .get_or_resolve(U::descriptor(), &Selection::only(Vec::<String>::new()))
            .unwrap();
        assert_eq!(cache.len(), 2);
    }
}
