//! The population engine.
//!
//! Assigns payload values onto an entity and, when recursive, upserts its
//! related entities: payload elements carrying a primary key are matched
//! against existing records preloaded with one repository call per
//! relationship, the others become new instances.
//!
//! Nothing is persisted; the caller owns the unit of work.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config;
use crate::descriptor::{EntityType, Relationship};
use crate::entity::{Entity, RelationValue};
use crate::error::{ModelError, ModelResult};
use crate::modelmap_debug;
use crate::repository::Repository;
use crate::value::{Record, Value};

/// What to do with a payload primary key that matches no existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedKeyPolicy {
    /// Create a new instance and drop the key.
    #[default]
    Create,
    /// Fail with a `RecordNotFound` error.
    Reject,
}

impl UnmatchedKeyPolicy {
    /// Parse a policy name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "create" => Some(Self::Create),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Options of a population call.
#[derive(Clone, Copy, Default)]
pub struct PopulateOptions<'r> {
    /// Populate relationships too.
    pub recursive: bool,
    /// Source of existing related records.
    pub repository: Option<&'r dyn Repository>,
    /// Unmatched key policy; `None` uses the configured default.
    pub unmatched: Option<UnmatchedKeyPolicy>,
}

impl<'r> PopulateOptions<'r> {
    /// Options that only assign columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate relationships, preloading existing records from `repository`.
    pub fn with_repository(repository: &'r dyn Repository) -> Self {
        Self {
            recursive: true,
            repository: Some(repository),
            unmatched: None,
        }
    }

    /// Enable or disable relationship population.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the repository.
    pub fn repository(mut self, repository: &'r dyn Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the unmatched key policy.
    pub fn unmatched(mut self, policy: UnmatchedKeyPolicy) -> Self {
        self.unmatched = Some(policy);
        self
    }
}

impl fmt::Debug for PopulateOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopulateOptions")
            .field("recursive", &self.recursive)
            .field("repository", &self.repository.is_some())
            .field("unmatched", &self.unmatched)
            .finish()
    }
}

/// Convert a JSON payload into a record.
pub fn payload_record(entity_type: &EntityType, payload: &serde_json::Value) -> ModelResult<Record> {
    match Value::from(payload.clone()) {
        Value::Record(record) => Ok(record),
        other => Err(ModelError::invalid_payload(
            entity_type.name(),
            format!("expected an object, found {}", other.type_name()),
        )),
    }
}

/// Name of the attribute a payload key assigns, if any.
///
/// Columns that are geometry-typed or excluded by default are not
/// assignable; synonyms assign their target column.
pub fn assignable_target<'t>(entity_type: &'t EntityType, key: &str) -> Option<&'t str> {
    let assignable = |name: &str| {
        entity_type
            .column(name)
            .is_some_and(|c| !c.column_type.is_geometry())
    };
    if entity_type.column(key).is_some() {
        if assignable(key) && !entity_type.defaults().exclude.contains(key) {
            return entity_type.column(key).map(|c| c.name.as_str());
        }
        return None;
    }
    entity_type
        .synonym(key)
        .filter(|s| assignable(&s.target))
        .map(|s| s.target.as_str())
}

/// Assign a payload onto an entity.
///
/// A relationship given as null, an empty string, an empty list or an empty
/// record is cleared. Each related entity is owned by exactly one slot, so a
/// primary key listed twice for the same relationship fails with
/// `DuplicateKey` instead of sharing one instance between both elements.
pub fn populate(entity: &mut dyn Entity, payload: &Record, options: &PopulateOptions<'_>) -> ModelResult<()> {
    let entity_type = entity.entity_type();

    for (key, value) in payload {
        if let Some(target) = assignable_target(entity_type, key) {
            entity.set(target, value.clone())?;
        }
    }

    if !options.recursive {
        return Ok(());
    }

    let policy = options
        .unmatched
        .unwrap_or_else(|| config::global().populate.unmatched_key);

    for relationship in entity_type.relationships() {
        let Some(value) = payload.get(relationship.name.as_str()) else {
            continue;
        };

        let content = if value.is_empty() {
            RelationValue::empty(relationship.is_many())
        } else {
            let related = upsert_related(entity_type, relationship, value, options, policy)?;
            if relationship.is_many() {
                RelationValue::Many(related)
            } else {
                RelationValue::One(related.into_iter().next())
            }
        };
        entity.set_relation(&relationship.name, content)?;
    }

    Ok(())
}

fn upsert_related(
    owner: &EntityType,
    relationship: &Relationship,
    value: &Value,
    options: &PopulateOptions<'_>,
    policy: UnmatchedKeyPolicy,
) -> ModelResult<Vec<Box<dyn Entity>>> {
    let target = relationship.target();
    let pk = target.primary_key();
    let items = normalize(value, pk);

    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    for item in &items {
        let Some(key_value) = item.get(pk).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(key) = key_value.key() {
            if !seen.insert(key.clone()) {
                return Err(ModelError::duplicate_key(
                    owner.name(),
                    relationship.name.as_str(),
                    key,
                ));
            }
            keys.push(key_value.clone());
        }
    }

    let mut preloaded = preload(owner, relationship, target, &keys, options)?;

    let mut related = Vec::with_capacity(items.len());
    for mut item in items {
        let key = item.get(pk).and_then(Value::key);
        let mut instance = match key {
            Some(key) => match preloaded.remove(&key) {
                Some(existing) => existing,
                None => match policy {
                    UnmatchedKeyPolicy::Reject => {
                        return Err(ModelError::not_found(target.name(), key));
                    }
                    UnmatchedKeyPolicy::Create => {
                        debug!(
                            entity = target.name(),
                            key = %key,
                            "No existing record for primary key, creating a new one"
                        );
                        item.shift_remove(pk);
                        target.new_instance()?
                    }
                },
            },
            None => {
                item.shift_remove(pk);
                target.new_instance()?
            }
        };
        populate(instance.as_mut(), &item, options)?;
        related.push(instance);
    }

    Ok(related)
}

fn normalize(value: &Value, pk: &str) -> Vec<Record> {
    let elements = match value {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    };
    elements
        .into_iter()
        .map(|element| match element {
            Value::Record(record) => record,
            bare_key => {
                let mut record = Record::with_capacity(1);
                record.insert(pk.to_string(), bare_key);
                record
            }
        })
        .collect()
}

fn preload(
    owner: &EntityType,
    relationship: &Relationship,
    target: &'static EntityType,
    keys: &[Value],
    options: &PopulateOptions<'_>,
) -> ModelResult<HashMap<String, Box<dyn Entity>>> {
    if keys.is_empty() {
        return Ok(HashMap::new());
    }
    let repository = options
        .repository
        .ok_or_else(|| ModelError::missing_repository(owner.name(), relationship.name.as_str()))?;

    modelmap_debug!(
        entity = target.name(),
        keys = keys.len(),
        "Preloading related records"
    );

    let pk = target.primary_key();
    let existing = repository.fetch_by_primary_keys(target, keys)?;
    Ok(existing
        .into_iter()
        .filter_map(|entity| {
            let key = entity.get(pk).and_then(|v| v.key())?;
            Some((key, entity))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Model, Serializable};
    use crate::error::ErrorCode;
    use crate::fixtures::{Child, Parent, Tagged, V};
    use crate::record;
    use crate::repository::MemoryRepository;

    #[test]
    fn test_assign_columns() {
        let mut child = Child::default();
        child
            .from_dict(&record! { "pk" => 4, "parent_pk" => 2, "unknown" => 1 }, &PopulateOptions::new())
            .unwrap();
        assert_eq!(child.pk, 4);
        assert_eq!(child.parent_pk, Some(2));
    }

    #[test]
    fn test_default_exclude_is_not_assignable() {
        assert_eq!(assignable_target(V::descriptor(), "pk"), Some("pk"));
        assert_eq!(assignable_target(V::descriptor(), "u_pk"), None);
    }

    #[test]
    fn test_synonym_assigns_target_and_geometry_is_skipped() {
        assert_eq!(assignable_target(Tagged::descriptor(), "title"), Some("name"));
        assert_eq!(assignable_target(Tagged::descriptor(), "shape"), None);
        assert_eq!(assignable_target(Tagged::descriptor(), "display"), None);
    }

    #[test]
    fn test_invalid_value() {
        let mut child = Child::default();
        let err = child
            .from_dict(&record! { "pk" => "abc" }, &PopulateOptions::new())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidValue);
    }

    #[test]
    fn test_relationships_ignored_when_not_recursive() {
        let mut parent = Parent::new(1);
        parent
            .from_dict(&record! { "childs" => vec![Value::Int(1)] }, &PopulateOptions::new())
            .unwrap();
        assert!(parent.childs.is_empty());
    }

    #[test]
    fn test_bare_keys_match_existing_records() {
        let repo = MemoryRepository::new();
        repo.insert(&Child::new(1, None)).unwrap();
        repo.insert(&Child::new(2, None)).unwrap();

        let mut parent = Parent::new(1);
        parent
            .from_dict(
                &record! { "childs" => vec![Value::Int(2), Value::Int(1)] },
                &PopulateOptions::with_repository(&repo),
            )
            .unwrap();
        assert_eq!(parent.childs.iter().map(|c| c.pk).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(repo.fetch_count(), 1);
    }

    #[test]
    fn test_single_bare_key_for_to_one() {
        let repo = MemoryRepository::new();
        repo.insert(&Parent::new(9)).unwrap();

        let mut child = Child::new(1, None);
        child
            .from_dict(&record! { "parent" => 9 }, &PopulateOptions::with_repository(&repo))
            .unwrap();
        assert_eq!(child.parent.as_ref().map(|p| p.pk), Some(9));
    }

    #[test]
    fn test_empty_payload_clears_relationship() {
        let mut parent = Parent::with_childs(1, vec![Child::new(1, Some(1))]);
        parent
            .from_dict(&record! { "childs" => Value::Null }, &PopulateOptions::with_repository(&MemoryRepository::new()))
            .unwrap();
        assert!(parent.childs.is_empty());

        let mut child = Child::new(1, None);
        child.parent = Some(Box::new(Parent::new(3)));
        child
            .from_dict(&record! { "parent" => Record::new() }, &PopulateOptions::new().recursive(true))
            .unwrap();
        assert!(child.parent.is_none());
    }

    #[test]
    fn test_empty_string_clears_to_one() {
        let mut child = Child::new(1, Some(3));
        child.parent = Some(Box::new(Parent::new(3)));
        child
            .from_dict(&record! { "parent" => "" }, &PopulateOptions::new().recursive(true))
            .unwrap();
        assert!(child.parent.is_none());
        assert_eq!(child.parent_pk, Some(3));
    }

    #[test]
    fn test_missing_repository() {
        let mut parent = Parent::new(1);
        let err = parent
            .from_dict(&record! { "childs" => vec![Value::Int(1)] }, &PopulateOptions::new().recursive(true))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRepository);
    }

    #[test]
    fn test_no_keys_needs_no_repository() {
        let mut parent = Parent::new(1);
        parent
            .from_dict(
                &record! { "childs" => vec![Value::Record(record! { "parent_pk" => 1 })] },
                &PopulateOptions::new().recursive(true),
            )
            .unwrap();
        assert_eq!(parent.childs.len(), 1);
        assert_eq!(parent.childs[0].parent_pk, Some(1));
    }

    #[test]
    fn test_payload_record_requires_object() {
        let err = payload_record(Parent::descriptor(), &serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPayload);
    }

    #[test]
    fn test_unmatched_policy_parse() {
        assert_eq!(UnmatchedKeyPolicy::parse("Reject"), Some(UnmatchedKeyPolicy::Reject));
        assert_eq!(UnmatchedKeyPolicy::parse("upsert"), None);
    }
}
