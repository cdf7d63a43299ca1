//! Resolved per-entity metadata used by the query compiler.
//!
//! An [`EntityDescriptor`] merges an entity's scalar fields with the relations
//! navigable from it, so path resolution is one lookup per segment.

use super::{CollectionKind, FetchMode, FieldType, RelationDef, SchemaBundle};
use crate::error::Error;

/// Shape of a relationship field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationShape {
    ToOne,
    List,
    Set,
    Map { key: String },
}

/// Relationship field metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    /// Target entity type.
    pub target: String,
    /// Container shape.
    pub shape: RelationShape,
    /// Fetch mode for whole-entity reads.
    pub fetch: FetchMode,
    /// The underlying definition, for join construction.
    pub def: RelationDef,
}

/// What a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(FieldType),
    Relation(RelationDescriptor),
}

/// A single field of an entity descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub is_identity: bool,
}

/// Immutable field map for one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Entity type name.
    pub name: String,
    /// Identity field name.
    pub identity: String,
    identity_type: FieldType,
    fields: Vec<FieldDescriptor>,
}

impl FieldDescriptor {
    /// Relation metadata if this is a relationship field.
    pub fn relation(&self) -> Option<&RelationDescriptor> {
        match &self.kind {
            FieldKind::Relation(r) => Some(r),
            FieldKind::Scalar(_) => None,
        }
    }

    /// Declared type if this is a scalar field.
    pub fn scalar(&self) -> Option<&FieldType> {
        match &self.kind {
            FieldKind::Scalar(t) => Some(t),
            FieldKind::Relation(_) => None,
        }
    }
}

impl RelationShape {
    fn of(relation: &RelationDef) -> Self {
        if !relation.is_to_many() {
            return RelationShape::ToOne;
        }
        match &relation.collection {
            CollectionKind::List => RelationShape::List,
            CollectionKind::Set => RelationShape::Set,
            CollectionKind::Map { key } => RelationShape::Map { key: key.clone() },
        }
    }

    /// Check if the relation yields a collection.
    pub fn is_to_many(&self) -> bool {
        !matches!(self, RelationShape::ToOne)
    }
}

impl EntityDescriptor {
    /// Build the descriptor for `name` from a schema snapshot.
    pub fn from_schema(schema: &SchemaBundle, name: &str) -> Result<Self, Error> {
        let entity = schema
            .get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))?;

        let mut fields: Vec<FieldDescriptor> = entity
            .fields
            .iter()
            .map(|f| FieldDescriptor {
                name: f.name.clone(),
                kind: FieldKind::Scalar(f.field_type.clone()),
                is_identity: f.name == entity.identity_field,
            })
            .collect();

        for relation in schema.relations_from(name) {
            fields.push(FieldDescriptor {
                name: relation.name.clone(),
                kind: FieldKind::Relation(RelationDescriptor {
                    target: relation.to_entity.clone(),
                    shape: RelationShape::of(relation),
                    fetch: relation.fetch,
                    def: relation.clone(),
                }),
                is_identity: false,
            });
        }

        let identity_type = entity
            .get_identity_field()
            .map(|f| f.field_type.clone())
            .ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "entity '{}' does not declare its identity field '{}'",
                    name, entity.identity_field
                ))
            })?;

        Ok(Self {
            name: entity.name.clone(),
            identity: entity.identity_field.clone(),
            identity_type,
            fields,
        })
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All fields, scalars first, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Declared type of the identity field.
    pub fn identity_type(&self) -> &FieldType {
        &self.identity_type
    }

    /// Scalar fields with their declared types.
    pub fn scalar_fields(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.fields
            .iter()
            .filter_map(|f| f.scalar().map(|t| (f.name.as_str(), t)))
    }

    /// Relationship fields.
    pub fn relation_fields(&self) -> impl Iterator<Item = (&str, &RelationDescriptor)> {
        self.fields
            .iter()
            .filter_map(|f| f.relation().map(|r| (f.name.as_str(), r)))
    }
}
