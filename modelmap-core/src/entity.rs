//! The entity traits consumed and exposed by the engines.
//!
//! [`Entity`] is the object-safe view the engines need of a domain type:
//! read and write attributes by name, read and replace relationships. It is
//! normally implemented by `#[derive(Entity)]`, which also implements
//! [`Model`] to expose the type's descriptor statically.
//!
//! [`Serializable`] is the extension trait applications call: it is
//! implemented for every entity and for `dyn Entity`.

use std::any::{Any, type_name};

use crate::descriptor::EntityType;
use crate::error::{ModelError, ModelResult};
use crate::legacy::LegacyOptions;
use crate::populate::{self, PopulateOptions};
use crate::serialize::{self, SerializeOptions};
use crate::value::{ColumnValue, Record, Value};

/// Borrowed view of a relationship's current content.
pub enum RelationRef<'a> {
    /// To-one relationship, possibly empty.
    One(Option<&'a dyn Entity>),
    /// To-many relationship, in the order the entity holds them.
    Many(Vec<&'a dyn Entity>),
}

impl<'a> RelationRef<'a> {
    /// View a to-one relationship.
    pub fn one<T: Entity>(value: Option<&'a T>) -> Self {
        Self::One(value.map(|v| v as &dyn Entity))
    }

    /// View a to-many relationship.
    pub fn many<T: Entity>(values: impl IntoIterator<Item = &'a T>) -> Self {
        Self::Many(values.into_iter().map(|v| v as &dyn Entity).collect())
    }
}

/// Owned replacement content for a relationship.
pub enum RelationValue {
    /// To-one content.
    One(Option<Box<dyn Entity>>),
    /// To-many content.
    Many(Vec<Box<dyn Entity>>),
}

impl RelationValue {
    /// Empty content for a relationship of the given cardinality.
    pub fn empty(many: bool) -> Self {
        if many {
            Self::Many(Vec::new())
        } else {
            Self::One(None)
        }
    }

    /// Unwrap into a list of concrete entities.
    ///
    /// `model` and `relationship` name the owner for the error raised when an
    /// element is not a `T`.
    pub fn into_many<T: Entity>(self, model: &str, relationship: &str) -> ModelResult<Vec<T>> {
        let items = match self {
            Self::Many(items) => items,
            Self::One(item) => item.into_iter().collect(),
        };
        items
            .into_iter()
            .map(|item| {
                item.downcast::<T>()
                    .map(|boxed| *boxed)
                    .ok_or_else(|| ModelError::type_mismatch(model, relationship, type_name::<T>()))
            })
            .collect()
    }

    /// Unwrap into an optional boxed concrete entity.
    pub fn into_one<T: Entity>(self, model: &str, relationship: &str) -> ModelResult<Option<Box<T>>> {
        let item = match self {
            Self::One(item) => item,
            Self::Many(items) => items.into_iter().next(),
        };
        item.map(|item| {
            item.downcast::<T>()
                .ok_or_else(|| ModelError::type_mismatch(model, relationship, type_name::<T>()))
        })
        .transpose()
    }
}

/// Convert a payload value into a typed attribute.
///
/// Conversion failures name the attribute in the returned `InvalidValue` error.
pub fn assign_column<T: ColumnValue>(model: &str, field: &str, value: Value) -> ModelResult<T> {
    T::from_value(value).map_err(|e| ModelError::invalid_value(model, field, e))
}

/// Object-safe attribute access used by the engines.
pub trait Entity: Any {
    /// Descriptor of the concrete type.
    fn entity_type(&self) -> &'static EntityType;

    /// Read a column, synonym target or computed property.
    ///
    /// `None` means the attribute does not exist on this instance.
    fn get(&self, name: &str) -> Option<Value>;

    /// Assign a column from a payload value.
    fn set(&mut self, name: &str, value: Value) -> ModelResult<()>;

    /// Borrow a relationship's content. May load it on first access.
    fn relation(&self, name: &str) -> Option<RelationRef<'_>>;

    /// Replace a relationship's content.
    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()>;

    /// Whether a relationship is already materialized.
    fn is_loaded(&self, _name: &str) -> bool {
        true
    }

    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcast an owned box for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Entity {
    /// Check the concrete type.
    pub fn is<T: Entity>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast a reference.
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast an owned box.
    pub fn downcast<T: Entity>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

/// Entity types with a statically known descriptor.
pub trait Model: Entity + Sized {
    /// The descriptor shared by all instances.
    fn descriptor() -> &'static EntityType;
}

/// Serialization and population entry points.
pub trait Serializable {
    /// Serialize with the declared defaults.
    fn as_dict(&self) -> ModelResult<Record> {
        self.as_dict_with(&SerializeOptions::default())
    }

    /// Serialize with explicit options.
    fn as_dict_with(&self, options: &SerializeOptions) -> ModelResult<Record>;

    /// Serialize with the deprecated parameter set.
    fn as_dict_legacy(&self, options: &LegacyOptions) -> ModelResult<Record>;

    /// Assign payload values, upserting related entities when recursive.
    fn from_dict(&mut self, payload: &Record, options: &PopulateOptions<'_>) -> ModelResult<&mut Self>;

    /// Assign a JSON object payload.
    fn from_json(
        &mut self,
        payload: &serde_json::Value,
        options: &PopulateOptions<'_>,
    ) -> ModelResult<&mut Self>;
}

impl Serializable for dyn Entity {
    fn as_dict_with(&self, options: &SerializeOptions) -> ModelResult<Record> {
        serialize::serialize(self, options)
    }

    fn as_dict_legacy(&self, options: &LegacyOptions) -> ModelResult<Record> {
        serialize::serialize_legacy(self, options)
    }

    fn from_dict(&mut self, payload: &Record, options: &PopulateOptions<'_>) -> ModelResult<&mut Self> {
        populate::populate(self, payload, options)?;
        Ok(self)
    }

    fn from_json(
        &mut self,
        payload: &serde_json::Value,
        options: &PopulateOptions<'_>,
    ) -> ModelResult<&mut Self> {
        let record = populate::payload_record(self.entity_type(), payload)?;
        self.from_dict(&record, options)
    }
}

impl<T: Entity> Serializable for T {
    fn as_dict_with(&self, options: &SerializeOptions) -> ModelResult<Record> {
        serialize::serialize(self, options)
    }

    fn as_dict_legacy(&self, options: &LegacyOptions) -> ModelResult<Record> {
        serialize::serialize_legacy(self, options)
    }

    fn from_dict(&mut self, payload: &Record, options: &PopulateOptions<'_>) -> ModelResult<&mut Self> {
        populate::populate(self, payload, options)?;
        Ok(self)
    }

    fn from_json(
        &mut self,
        payload: &serde_json::Value,
        options: &PopulateOptions<'_>,
    ) -> ModelResult<&mut Self> {
        let record = populate::payload_record(self.entity_type(), payload)?;
        self.from_dict(&record, options)
    }
}
