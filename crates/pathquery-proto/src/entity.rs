//! Entity graph objects returned by find operations.
//!
//! An [`Entity`] is a loosely typed record: scalar fields hold [`Value`]s and
//! relationship fields hold a [`Relation`] that records whether the related
//! data was loaded.

use crate::value::{Key, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A materialized entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type name.
    pub entity_type: String,
    /// Identity value.
    pub id: Value,
    /// Field slots keyed by field name.
    pub fields: BTreeMap<String, FieldSlot>,
}

/// Contents of a single entity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldSlot {
    /// A scalar or document value.
    Value(Value),
    /// A relationship to other entities.
    Relation(Relation),
}

/// Load state of a relationship field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Relation {
    /// Not fetched; reading it says nothing about the related data.
    Unloaded,
    /// Being populated by an in-flight materialization.
    Loading,
    /// Fetched, possibly empty.
    Loaded(RelationValue),
}

/// A loaded relationship value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationValue {
    /// To-one relation; `None` when no related entity exists.
    One(Option<Box<Entity>>),
    /// Ordered to-many relation.
    List(Vec<Entity>),
    /// Unordered to-many relation without duplicate identities.
    Set(Vec<Entity>),
    /// To-many relation keyed by a field of the related entity.
    Map(Vec<(Value, Entity)>),
}

impl Entity {
    /// Create an entity with no fields.
    pub fn new(entity_type: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a scalar field value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), FieldSlot::Value(value.into()));
        self
    }

    /// Add a relation field.
    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.fields.insert(name.into(), FieldSlot::Relation(relation));
        self
    }

    /// Get a field slot by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.get(name)
    }

    /// Set a field slot, replacing any previous contents.
    pub fn set_field(&mut self, name: impl Into<String>, slot: FieldSlot) {
        self.fields.insert(name.into(), slot);
    }

    /// Get a scalar field value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(FieldSlot::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Get a relation field.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        match self.fields.get(name) {
            Some(FieldSlot::Relation(r)) => Some(r),
            _ => None,
        }
    }

    /// Get a mutable relation field.
    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        match self.fields.get_mut(name) {
            Some(FieldSlot::Relation(r)) => Some(r),
            _ => None,
        }
    }

    /// Identity key of this entity, if the identity is not null.
    pub fn identity(&self) -> Option<(String, Key)> {
        self.id.key().map(|k| (self.entity_type.clone(), k))
    }

    /// Check whether two entities denote the same stored record.
    pub fn same_identity(&self, other: &Entity) -> bool {
        self.entity_type == other.entity_type
            && self.id.key().is_some()
            && self.id.key() == other.id.key()
    }
}

impl Relation {
    /// Check whether the relation holds fetched data.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }

    /// Get the loaded value.
    pub fn loaded(&self) -> Option<&RelationValue> {
        match self {
            Relation::Loaded(v) => Some(v),
            _ => None,
        }
    }

    /// Get the loaded value mutably.
    pub fn loaded_mut(&mut self) -> Option<&mut RelationValue> {
        match self {
            Relation::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

impl RelationValue {
    /// Related entities in stored order.
    pub fn entities(&self) -> Vec<&Entity> {
        match self {
            RelationValue::One(one) => one.iter().map(|e| &**e).collect(),
            RelationValue::List(items) | RelationValue::Set(items) => items.iter().collect(),
            RelationValue::Map(entries) => entries.iter().map(|(_, e)| e).collect(),
        }
    }

    /// Related entities in stored order, mutably.
    pub fn entities_mut(&mut self) -> Vec<&mut Entity> {
        match self {
            RelationValue::One(one) => one.iter_mut().map(|e| &mut **e).collect(),
            RelationValue::List(items) | RelationValue::Set(items) => items.iter_mut().collect(),
            RelationValue::Map(entries) => entries.iter_mut().map(|(_, e)| e).collect(),
        }
    }

    /// Number of related entities.
    pub fn len(&self) -> usize {
        match self {
            RelationValue::One(one) => usize::from(one.is_some()),
            RelationValue::List(items) | RelationValue::Set(items) => items.len(),
            RelationValue::Map(entries) => entries.len(),
        }
    }

    /// Check if no entity is related.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
