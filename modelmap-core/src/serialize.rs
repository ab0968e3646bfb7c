//! The serialization engine.
//!
//! Walks an entity and its relationships and produces an ordered [`Record`]:
//! columns first (columns, synonyms, computed properties in declaration
//! order), then relationships in declaration order. Each relationship is
//! serialized with the sub-selection the resolver computed for it.
//!
//! ```rust,ignore
//! use modelmap::prelude::*;
//!
//! let record = child.as_dict_with(
//!     &SerializeOptions::new()
//!         .fields(["pk", "parent"])
//!         .unloaded(UnloadedPolicy::Raise),
//! )?;
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config;
use crate::entity::{Entity, RelationRef};
use crate::error::{ModelError, ModelResult};
use crate::legacy::{LegacyOptions, Recursion};
use crate::selection::Selection;
use crate::value::{Record, Value};

/// What to do when a requested relationship is not materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnloadedPolicy {
    /// Access it anyway, letting the entity load it.
    #[default]
    Fetch,
    /// Log a warning, then access it.
    Warn,
    /// Fail with a `RelationshipNotLoaded` error.
    Raise,
}

impl UnloadedPolicy {
    /// Parse a policy name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "fetch" | "none" => Some(Self::Fetch),
            "warn" => Some(Self::Warn),
            "raise" => Some(Self::Raise),
            _ => None,
        }
    }
}

/// Options of a serialization call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Fields and exclude sets.
    pub selection: Selection,
    /// Stringify override; `None` uses each type's declared default.
    pub stringify: Option<bool>,
    /// Unloaded relationship policy; `None` uses the configured default.
    pub unloaded: Option<UnloadedPolicy>,
}

impl SerializeOptions {
    /// Options using every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested fields.
    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selection = self.selection.fields(fields);
        self
    }

    /// Set the excluded fields.
    pub fn exclude(mut self, exclude: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selection = self.selection.exclude(exclude);
        self
    }

    /// Replace the whole selection.
    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Override stringification.
    pub fn stringify(mut self, stringify: bool) -> Self {
        self.stringify = Some(stringify);
        self
    }

    /// Set the unloaded relationship policy.
    pub fn unloaded(mut self, policy: UnloadedPolicy) -> Self {
        self.unloaded = Some(policy);
        self
    }
}

/// Serialize one entity.
pub fn serialize(entity: &dyn Entity, options: &SerializeOptions) -> ModelResult<Record> {
    Walker::new(options).walk(entity, options.selection.clone(), None)
}

/// Serialize a sequence of entities with the same options.
pub fn serialize_all<'a, E, I>(entities: I, options: &SerializeOptions) -> ModelResult<Vec<Record>>
where
    E: Entity + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let walker = Walker::new(options);
    entities
        .into_iter()
        .map(|entity| walker.walk(entity, options.selection.clone(), None))
        .collect()
}

/// Serialize one entity with the deprecated parameter set.
pub fn serialize_legacy(entity: &dyn Entity, options: &LegacyOptions) -> ModelResult<Record> {
    let (selection, recursion) = options.lower();
    Walker::new(&options.base).walk(entity, selection, recursion)
}

/// Settings shared by every level of one serialization call.
struct Walker {
    stringify: Option<bool>,
    unloaded: UnloadedPolicy,
}

impl Walker {
    fn new(options: &SerializeOptions) -> Self {
        Self {
            stringify: options.stringify,
            unloaded: options
                .unloaded
                .unwrap_or_else(|| config::global().serialize.unloaded),
        }
    }

    fn walk(
        &self,
        entity: &dyn Entity,
        selection: Selection,
        recursion: Option<Recursion>,
    ) -> ModelResult<Record> {
        let entity_type = entity.entity_type();
        let (selection, recursion) = match recursion {
            Some(recursion) => {
                let (selection, recursion) = recursion.descend(entity_type, selection);
                (selection, Some(recursion))
            }
            None => (selection, None),
        };

        let resolved = entity_type.resolve(&selection)?;
        let stringify = self.stringify.unwrap_or(entity_type.defaults().stringify);

        let mut record =
            Record::with_capacity(resolved.columns.len() + resolved.relationships.len());

        for column in &resolved.columns {
            let mut value = entity.get(&column.source).unwrap_or(Value::Null);
            if stringify && !value.is_null() {
                if let Some(serializer) = column.serializer {
                    value = serializer(&value);
                }
            }
            record.insert(column.name.to_string(), value);
        }

        for relationship in &resolved.relationships {
            if self.unloaded != UnloadedPolicy::Fetch && !entity.is_loaded(&relationship.name) {
                match self.unloaded {
                    UnloadedPolicy::Raise => {
                        return Err(ModelError::not_loaded(
                            entity_type.name(),
                            relationship.name.as_str(),
                        ));
                    }
                    _ => warn!(
                        entity = entity_type.name(),
                        relationship = relationship.name.as_str(),
                        "Relationship '{}' on '{}' is not loaded",
                        relationship.name,
                        entity_type.name()
                    ),
                }
            }

            let value = match entity.relation(&relationship.name) {
                Some(RelationRef::Many(items)) => Value::List(
                    items
                        .into_iter()
                        .map(|item| {
                            self.walk(item, relationship.selection.clone(), recursion.clone())
                                .map(Value::Record)
                        })
                        .collect::<ModelResult<_>>()?,
                ),
                Some(RelationRef::One(Some(item))) => Value::Record(self.walk(
                    item,
                    relationship.selection.clone(),
                    recursion.clone(),
                )?),
                Some(RelationRef::One(None)) | None if relationship.many => Value::List(Vec::new()),
                Some(RelationRef::One(None)) | None => Value::Null,
            };
            record.insert(relationship.name.to_string(), value);
        }

        match entity_type.post_process() {
            Some(hook) => Ok(hook(entity, record)),
            None => Ok(record),
        }
    }
}
