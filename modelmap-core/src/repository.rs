//! Bulk access to existing records.
//!
//! The population engine never queries one record at a time: for every
//! relationship in a payload it asks the [`Repository`] for all the primary
//! keys at once. Applications implement the trait over their persistence
//! layer; [`MemoryRepository`] keeps snapshots in memory for tests and
//! fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::descriptor::EntityType;
use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::value::{Record, Value};

/// Source of existing entities, fetched by primary key.
pub trait Repository {
    /// Fetch every existing entity of `entity_type` whose primary key is in
    /// `keys`. Unknown keys are skipped; order is not significant.
    fn fetch_by_primary_keys(
        &self,
        entity_type: &'static EntityType,
        keys: &[Value],
    ) -> ModelResult<Vec<Box<dyn Entity>>>;
}

impl<R: Repository + ?Sized> Repository for &R {
    fn fetch_by_primary_keys(
        &self,
        entity_type: &'static EntityType,
        keys: &[Value],
    ) -> ModelResult<Vec<Box<dyn Entity>>> {
        (**self).fetch_by_primary_keys(entity_type, keys)
    }
}

/// Thread-safe in-memory repository of column snapshots.
///
/// Entities are stored as the values of their columns and rebuilt through
/// the type's factory on every fetch, so fetched instances never alias.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<HashMap<SmolStr, IndexMap<String, Record>>>,
    fetches: AtomicUsize,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot of an entity's columns, replacing any previous one.
    pub fn insert(&self, entity: &dyn Entity) -> ModelResult<()> {
        let entity_type = entity.entity_type();
        let snapshot: Record = entity_type
            .columns()
            .iter()
            .filter(|c| !c.column_type.is_geometry())
            .map(|c| {
                let value = entity.get(&c.name).unwrap_or(Value::Null);
                (c.name.to_string(), value)
            })
            .collect();
        self.insert_record(entity_type, snapshot)
    }

    /// Store a record of column values for `entity_type`.
    pub fn insert_record(&self, entity_type: &EntityType, record: Record) -> ModelResult<()> {
        let key = record
            .get(entity_type.primary_key())
            .and_then(Value::key)
            .ok_or_else(|| {
                ModelError::invalid_payload(entity_type.name(), "a stored record needs a primary key")
            })?;
        self.tables
            .write()
            .entry(SmolStr::new(entity_type.name()))
            .or_default()
            .insert(key, record);
        Ok(())
    }

    /// Number of records stored for `entity_type`.
    pub fn len(&self, entity_type: &EntityType) -> usize {
        self.tables
            .read()
            .get(entity_type.name())
            .map_or(0, IndexMap::len)
    }

    /// Check if no record is stored for `entity_type`.
    pub fn is_empty(&self, entity_type: &EntityType) -> bool {
        self.len(entity_type) == 0
    }

    /// Number of `fetch_by_primary_keys` calls served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Reset the fetch counter.
    pub fn reset_fetch_count(&self) {
        self.fetches.store(0, Ordering::Relaxed);
    }
}

impl Repository for MemoryRepository {
    fn fetch_by_primary_keys(
        &self,
        entity_type: &'static EntityType,
        keys: &[Value],
    ) -> ModelResult<Vec<Box<dyn Entity>>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(
            entity = entity_type.name(),
            keys = keys.len(),
            "MemoryRepository::fetch_by_primary_keys()"
        );

        let tables = self.tables.read();
        let Some(table) = tables.get(entity_type.name()) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for key in keys.iter().filter_map(Value::key) {
            let Some(snapshot) = table.get(&key) else {
                continue;
            };
            let mut instance = entity_type.new_instance()?;
            for (name, value) in snapshot {
                instance.set(name, value.clone())?;
            }
            found.push(instance);
        }
        Ok(found)
    }
}
