//! Hand-written entities shared by the unit tests.
//!
//! These implement [`Entity`] the way `#[derive(Entity)]` does, so the core
//! crate can be tested without the proc-macro.

use std::any::Any;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};

use crate::descriptor::{EntityType, Relationship};
use crate::entity::{Entity, Model, RelationRef, RelationValue, assign_column};
use crate::error::{ModelError, ModelResult};
use crate::value::{ColumnType, ColumnValue, Geometry, Record, Value};

macro_rules! descriptor {
    ($builder:expr) => {{
        static DESCRIPTOR: OnceLock<EntityType> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| $builder.build().expect("fixture descriptor"))
    }};
}

macro_rules! any_impls {
    () => {
        fn entity_type(&self) -> &'static EntityType {
            Self::descriptor()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    };
}

// Parent / Child: one-to-many with a many-to-one back reference.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parent {
    pub pk: i64,
    pub childs: Vec<Child>,
}

impl Parent {
    pub fn new(pk: i64) -> Self {
        Self { pk, childs: Vec::new() }
    }

    pub fn with_childs(pk: i64, childs: Vec<Child>) -> Self {
        Self { pk, childs }
    }
}

impl Model for Parent {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("Parent")
                .primary_key("pk", ColumnType::Integer)
                .relationship(Relationship::one_to_many("childs", Child::descriptor))
                .factory(|| Box::new(Parent::default()))
        )
    }
}

impl Entity for Parent {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => Some(self.pk.to_value()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("Parent", name, value)?,
            _ => return Err(ModelError::unknown_field("Parent", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        match name {
            "childs" => Some(RelationRef::many(&self.childs)),
            _ => None,
        }
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "childs" => self.childs = value.into_many("Parent", name)?,
            _ => return Err(ModelError::unknown_relationship("Parent", name)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Child {
    pub pk: i64,
    pub parent_pk: Option<i64>,
    pub parent: Option<Box<Parent>>,
}

impl Child {
    pub fn new(pk: i64, parent_pk: Option<i64>) -> Self {
        Self { pk, parent_pk, parent: None }
    }
}

impl Model for Child {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("Child")
                .primary_key("pk", ColumnType::Integer)
                .column("parent_pk", ColumnType::Integer)
                .relationship(Relationship::many_to_one("parent", Parent::descriptor))
                .factory(|| Box::new(Child::default()))
        )
    }
}

impl Entity for Child {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => Some(self.pk.to_value()),
            "parent_pk" => Some(self.parent_pk.to_value()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("Child", name, value)?,
            "parent_pk" => self.parent_pk = assign_column("Child", name, value)?,
            _ => return Err(ModelError::unknown_field("Child", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        match name {
            "parent" => Some(RelationRef::one(self.parent.as_deref())),
            _ => None,
        }
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "parent" => self.parent = value.into_one("Child", name)?,
            _ => return Err(ModelError::unknown_relationship("Child", name)),
        }
        Ok(())
    }
}

// A -> B -> C chain, each with a back reference.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct A {
    pub pk: i64,
    pub b_set: Vec<B>,
}

impl Model for A {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("A")
                .primary_key("pk", ColumnType::Integer)
                .relationship(Relationship::one_to_many("b_set", B::descriptor))
                .factory(|| Box::new(A::default()))
        )
    }
}

impl Entity for A {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        (name == "pk").then(|| self.pk.to_value())
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("A", name, value)?,
            _ => return Err(ModelError::unknown_field("A", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        (name == "b_set").then(|| RelationRef::many(&self.b_set))
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "b_set" => self.b_set = value.into_many("A", name)?,
            _ => return Err(ModelError::unknown_relationship("A", name)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct B {
    pub pk: i64,
    pub a_pk: Option<i64>,
    pub a: Option<Box<A>>,
    pub c_set: Vec<C>,
}

impl Model for B {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("B")
                .primary_key("pk", ColumnType::Integer)
                .column("a_pk", ColumnType::Integer)
                .relationship(Relationship::many_to_one("a", A::descriptor))
                .relationship(Relationship::one_to_many("c_set", C::descriptor))
                .factory(|| Box::new(B::default()))
        )
    }
}

impl Entity for B {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => Some(self.pk.to_value()),
            "a_pk" => Some(self.a_pk.to_value()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("B", name, value)?,
            "a_pk" => self.a_pk = assign_column("B", name, value)?,
            _ => return Err(ModelError::unknown_field("B", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        match name {
            "a" => Some(RelationRef::one(self.a.as_deref())),
            "c_set" => Some(RelationRef::many(&self.c_set)),
            _ => None,
        }
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "a" => self.a = value.into_one("B", name)?,
            "c_set" => self.c_set = value.into_many("B", name)?,
            _ => return Err(ModelError::unknown_relationship("B", name)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct C {
    pub pk: i64,
    pub b_pk: Option<i64>,
    pub b: Option<Box<B>>,
}

impl Model for C {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("C")
                .primary_key("pk", ColumnType::Integer)
                .column("b_pk", ColumnType::Integer)
                .relationship(Relationship::many_to_one("b", B::descriptor))
                .factory(|| Box::new(C::default()))
        )
    }
}

impl Entity for C {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => Some(self.pk.to_value()),
            "b_pk" => Some(self.b_pk.to_value()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("C", name, value)?,
            "b_pk" => self.b_pk = assign_column("C", name, value)?,
            _ => return Err(ModelError::unknown_field("C", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        (name == "b").then(|| RelationRef::one(self.b.as_deref()))
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "b" => self.b = value.into_one("C", name)?,
            _ => return Err(ModelError::unknown_relationship("C", name)),
        }
        Ok(())
    }
}

// U / V: declared serialization defaults.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct U {
    pub pk: i64,
    pub v_set: Vec<V>,
}

impl Model for U {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("U")
                .primary_key("pk", ColumnType::Integer)
                .relationship(Relationship::one_to_many("v_set", V::descriptor))
                .default_fields(["v_set"])
                .factory(|| Box::new(U::default()))
        )
    }
}

impl Entity for U {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        (name == "pk").then(|| self.pk.to_value())
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("U", name, value)?,
            _ => return Err(ModelError::unknown_field("U", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        (name == "v_set").then(|| RelationRef::many(&self.v_set))
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "v_set" => self.v_set = value.into_many("U", name)?,
            _ => return Err(ModelError::unknown_relationship("U", name)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct V {
    pub pk: i64,
    pub u_pk: Option<i64>,
    pub u: Option<Box<U>>,
}

impl Model for V {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("V")
                .primary_key("pk", ColumnType::Integer)
                .column("u_pk", ColumnType::Integer)
                .relationship(Relationship::many_to_one("u", U::descriptor))
                .default_exclude(["u_pk"])
                .factory(|| Box::new(V::default()))
        )
    }
}

impl Entity for V {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => Some(self.pk.to_value()),
            "u_pk" => Some(self.u_pk.to_value()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("V", name, value)?,
            "u_pk" => self.u_pk = assign_column("V", name, value)?,
            _ => return Err(ModelError::unknown_field("V", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        (name == "u").then(|| RelationRef::one(self.u.as_deref()))
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "u" => self.u = value.into_one("V", name)?,
            _ => return Err(ModelError::unknown_relationship("V", name)),
        }
        Ok(())
    }
}

// Tagged: temporal column, synonym, computed property and geometry.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tagged {
    pub pk: i64,
    pub name: String,
    pub created: NaiveDateTime,
    pub label: String,
    pub shape: Geometry,
}

impl Tagged {
    pub fn sample() -> Self {
        let created = NaiveDate::from_ymd_opt(2020, 3, 14)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .expect("valid timestamp");
        Self {
            pk: 7,
            name: "sample".into(),
            created,
            label: "tag".into(),
            shape: Geometry("POINT(6 10)".into()),
        }
    }

    pub fn display(&self) -> String {
        format!("#{} {}", self.pk, self.name)
    }
}

impl Model for Tagged {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("Tagged")
                .primary_key("pk", ColumnType::Integer)
                .column("name", ColumnType::String)
                .column("created", ColumnType::DateTime)
                .column("label", ColumnType::String)
                .column("shape", ColumnType::Geometry)
                .synonym("title", "name")
                .computed("display", ColumnType::String)
                .default_fields(["pk"])
                .factory(|| Box::new(Tagged::default()))
        )
    }
}

impl Entity for Tagged {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => Some(self.pk.to_value()),
            "name" | "title" => Some(self.name.to_value()),
            "created" => Some(self.created.to_value()),
            "label" => Some(self.label.to_value()),
            "shape" => Some(self.shape.to_value()),
            "display" => Some(self.display().to_value()),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("Tagged", name, value)?,
            "name" => self.name = assign_column("Tagged", name, value)?,
            "created" => self.created = assign_column("Tagged", name, value)?,
            "label" => self.label = assign_column("Tagged", name, value)?,
            "shape" => self.shape = assign_column("Tagged", name, value)?,
            _ => return Err(ModelError::unknown_field("Tagged", name)),
        }
        Ok(())
    }

    fn relation(&self, _name: &str) -> Option<RelationRef<'_>> {
        None
    }

    fn set_relation(&mut self, name: &str, _value: RelationValue) -> ModelResult<()> {
        Err(ModelError::unknown_relationship("Tagged", name))
    }
}

// Lazy: a relationship that reports itself as not loaded.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lazy {
    pub pk: i64,
    pub items: Vec<Child>,
    pub loaded: bool,
}

impl Lazy {
    pub fn unloaded(pk: i64) -> Self {
        Self { pk, items: Vec::new(), loaded: false }
    }
}

impl Model for Lazy {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("Lazy")
                .primary_key("pk", ColumnType::Integer)
                .relationship(Relationship::one_to_many("items", Child::descriptor))
                .factory(|| Box::new(Lazy::default()))
        )
    }
}

impl Entity for Lazy {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        (name == "pk").then(|| self.pk.to_value())
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("Lazy", name, value)?,
            _ => return Err(ModelError::unknown_field("Lazy", name)),
        }
        Ok(())
    }

    fn relation(&self, name: &str) -> Option<RelationRef<'_>> {
        (name == "items").then(|| RelationRef::many(&self.items))
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> ModelResult<()> {
        match name {
            "items" => {
                self.items = value.into_many("Lazy", name)?;
                self.loaded = true;
            }
            _ => return Err(ModelError::unknown_relationship("Lazy", name)),
        }
        Ok(())
    }

    fn is_loaded(&self, name: &str) -> bool {
        name != "items" || self.loaded
    }
}

// Hooked: post-processing hook.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooked {
    pub pk: i64,
}

fn mark_hooked(_entity: &dyn Entity, mut record: Record) -> Record {
    record.insert("hooked".into(), Value::Bool(true));
    record
}

impl Model for Hooked {
    fn descriptor() -> &'static EntityType {
        descriptor!(
            EntityType::builder("Hooked")
                .primary_key("pk", ColumnType::Integer)
                .post_process(mark_hooked)
                .factory(|| Box::new(Hooked::default()))
        )
    }
}

impl Entity for Hooked {
    any_impls!();

    fn get(&self, name: &str) -> Option<Value> {
        (name == "pk").then(|| self.pk.to_value())
    }

    fn set(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match name {
            "pk" => self.pk = assign_column("Hooked", name, value)?,
            _ => return Err(ModelError::unknown_field("Hooked", name)),
        }
        Ok(())
    }

    fn relation(&self, _name: &str) -> Option<RelationRef<'_>> {
        None
    }

    fn set_relation(&mut self, name: &str, _value: RelationValue) -> ModelResult<()> {
        Err(ModelError::unknown_relationship("Hooked", name))
    }
}
