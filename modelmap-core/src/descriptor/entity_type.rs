//! Entity type descriptors and their builder.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use super::{Column, Computed, Relationship, Synonym};
use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::resolver::{ResolvedFields, ResolverCache};
use crate::selection::Selection;
use crate::value::{ColumnType, Record};

/// Hook applied to every record produced for an entity type.
pub type PostProcess = fn(&dyn Entity, Record) -> Record;

/// Creates a blank instance of an entity type.
pub type Factory = fn() -> Box<dyn Entity>;

/// Serialization defaults declared once per entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeDefaults {
    /// Fields used when the caller gives none.
    pub fields: BTreeSet<String>,
    /// Fields removed unless the caller gives an exclude set or asks for them.
    pub exclude: BTreeSet<String>,
    /// Whether temporal, UUID and decimal values render as strings.
    pub stringify: bool,
}

impl Default for SerializeDefaults {
    fn default() -> Self {
        Self {
            fields: BTreeSet::new(),
            exclude: BTreeSet::new(),
            stringify: true,
        }
    }
}

/// Introspection data of one entity type.
///
/// Built once per type and kept for the process lifetime. Each descriptor
/// owns the cache of its resolved selections.
pub struct EntityType {
    name: SmolStr,
    columns: Vec<Column>,
    synonyms: Vec<Synonym>,
    computed: Vec<Computed>,
    relationships: Vec<Relationship>,
    primary_key: SmolStr,
    defaults: SerializeDefaults,
    post_process: Option<PostProcess>,
    factory: Option<Factory>,
    cache: ResolverCache,
}

impl EntityType {
    /// Start building a descriptor.
    pub fn builder(name: impl Into<SmolStr>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    /// Name of the entity type, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns, in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Declared synonyms, in declaration order.
    pub fn synonyms(&self) -> &[Synonym] {
        &self.synonyms
    }

    /// Declared computed properties, in declaration order.
    pub fn computed(&self) -> &[Computed] {
        &self.computed
    }

    /// Declared relationships, in declaration order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Name of the primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Declared serialization defaults.
    pub fn defaults(&self) -> &SerializeDefaults {
        &self.defaults
    }

    /// Post-process hook, if declared.
    pub fn post_process(&self) -> Option<PostProcess> {
        self.post_process
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a synonym.
    pub fn synonym(&self, name: &str) -> Option<&Synonym> {
        self.synonyms.iter().find(|s| s.name == name)
    }

    /// Look up a relationship.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Check if `name` is a declared relationship.
    pub fn is_relationship(&self, name: &str) -> bool {
        self.relationship(name).is_some()
    }

    /// Check if `name` is a column, synonym or computed property.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_type(name).is_some()
    }

    /// Type of a column, synonym or computed property.
    ///
    /// Synonyms report the type of their target column.
    pub fn attribute_type(&self, name: &str) -> Option<ColumnType> {
        if let Some(column) = self.column(name) {
            return Some(column.column_type);
        }
        if let Some(synonym) = self.synonym(name) {
            return self.column(&synonym.target).map(|c| c.column_type);
        }
        self.computed
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Create a blank instance through the declared factory.
    pub fn new_instance(&self) -> ModelResult<Box<dyn Entity>> {
        match self.factory {
            Some(factory) => Ok(factory()),
            None => Err(ModelError::missing_factory(self.name.as_str())),
        }
    }

    /// Resolve a selection against this type, memoized in its cache.
    pub fn resolve(&self, selection: &Selection) -> ModelResult<Arc<ResolvedFields>> {
        self.cache.get_or_resolve(self, selection)
    }

    /// The cache of resolved selections.
    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Check if two references denote the same descriptor.
    #[inline]
    pub fn is(&self, other: &EntityType) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("synonyms", &self.synonyms)
            .field("computed", &self.computed)
            .field("relationships", &self.relationships)
            .field("primary_key", &self.primary_key)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntityType`].
///
/// ```rust
/// use modelmap_core::{ColumnType, EntityType};
///
/// let descriptor = EntityType::builder("Parent")
///     .primary_key("pk", ColumnType::Integer)
///     .column("name", ColumnType::String)
///     .synonym("label", "name")
///     .default_exclude(["name"])
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.primary_key(), "pk");
/// assert_eq!(descriptor.attribute_type("label"), Some(ColumnType::String));
/// ```
#[derive(Debug, Default)]
pub struct EntityTypeBuilder {
    name: SmolStr,
    columns: Vec<Column>,
    synonyms: Vec<Synonym>,
    computed: Vec<Computed>,
    relationships: Vec<Relationship>,
    defaults: SerializeDefaults,
    post_process: Option<PostProcess>,
    factory: Option<Factory>,
}

impl EntityTypeBuilder {
    /// Create a builder for the named type.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare the primary key column.
    pub fn primary_key(mut self, name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        self.columns.push(Column::primary_key(name, column_type));
        self
    }

    /// Declare a column.
    pub fn column(mut self, name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    /// Declare a synonym of an existing column.
    pub fn synonym(mut self, name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        self.synonyms.push(Synonym::new(name, target));
        self
    }

    /// Declare a computed property.
    pub fn computed(mut self, name: impl Into<SmolStr>, column_type: ColumnType) -> Self {
        self.computed.push(Computed::new(name, column_type));
        self
    }

    /// Declare a relationship.
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Set the default fields.
    pub fn default_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.defaults.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default exclude set.
    pub fn default_exclude(mut self, exclude: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.defaults.exclude = exclude.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether values are stringified by default.
    pub fn stringify(mut self, stringify: bool) -> Self {
        self.defaults.stringify = stringify;
        self
    }

    /// Set the post-process hook.
    pub fn post_process(mut self, hook: PostProcess) -> Self {
        self.post_process = Some(hook);
        self
    }

    /// Set the instance factory.
    pub fn factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Validate and build the descriptor.
    pub fn build(self) -> ModelResult<EntityType> {
        let invalid = |message: String| ModelError::invalid_descriptor(self.name.as_str(), message);

        let mut keys = self.columns.iter().filter(|c| c.primary_key);
        let primary_key = match (keys.next(), keys.next()) {
            (Some(pk), None) => pk.name.clone(),
            (None, _) => return Err(invalid("no primary key declared".into())),
            (Some(_), Some(_)) => {
                return Err(invalid("more than one primary key declared".into()));
            }
        };

        let mut seen = HashSet::new();
        let names = self
            .columns
            .iter()
            .map(|c| &c.name)
            .chain(self.synonyms.iter().map(|s| &s.name))
            .chain(self.computed.iter().map(|c| &c.name))
            .chain(self.relationships.iter().map(|r| &r.name));
        for name in names {
            if name.contains('.') || name.starts_with('+') || name.is_empty() {
                return Err(invalid(format!("'{}' is not a valid attribute name", name)));
            }
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("'{}' is declared more than once", name)));
            }
        }

        for synonym in &self.synonyms {
            if !self.columns.iter().any(|c| c.name == synonym.target) {
                return Err(invalid(format!(
                    "synonym '{}' targets unknown column '{}'",
                    synonym.name, synonym.target
                )));
            }
        }

        Ok(EntityType {
            name: self.name,
            columns: self.columns,
            synonyms: self.synonyms,
            computed: self.computed,
            relationships: self.relationships,
            primary_key,
            defaults: self.defaults,
            post_process: self.post_process,
            factory: self.factory,
            cache: ResolverCache::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Model;
    use crate::error::ErrorCode;

    fn other() -> &'static EntityType {
        crate::fixtures::Parent::descriptor()
    }

    #[test]
    fn test_builder_preserves_declaration_order() {
        let descriptor = EntityType::builder("Item")
            .primary_key("pk", ColumnType::Integer)
            .column("b", ColumnType::String)
            .column("a", ColumnType::Date)
            .computed("label", ColumnType::String)
            .relationship(Relationship::many_to_one("owner", other))
            .build()
            .unwrap();

        let names: Vec<_> = descriptor.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pk", "b", "a"]);
        assert_eq!(descriptor.attribute_type("label"), Some(ColumnType::String));
        assert!(descriptor.is_relationship("owner"));
        assert!(!descriptor.has_attribute("owner"));
        assert!(descriptor.defaults().stringify);
    }

    #[test]
    fn test_builder_requires_primary_key() {
        let err = EntityType::builder("Item")
            .column("name", ColumnType::String)
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDescriptor);
        assert!(err.message.contains("no primary key"));
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let err = EntityType::builder("Item")
            .primary_key("pk", ColumnType::Integer)
            .column("name", ColumnType::String)
            .relationship(Relationship::many_to_one("name", other))
            .build()
            .unwrap_err();
        assert!(err.message.contains("declared more than once"));
    }

    #[test]
    fn test_builder_rejects_dangling_synonym() {
        let err = EntityType::builder("Item")
            .primary_key("pk", ColumnType::Integer)
            .synonym("alias", "missing")
            .build()
            .unwrap_err();
        assert!(err.message.contains("unknown column 'missing'"));
    }

    #[test]
    fn test_new_instance_without_factory() {
        let descriptor = EntityType::builder("Item")
            .primary_key("pk", ColumnType::Integer)
            .build()
            .unwrap();
        let err = descriptor.new_instance().err().unwrap();
        assert_eq!(err.code, ErrorCode::MissingFactory);
    }
}
