//! Schema bundle - versioned snapshot of the entire schema.

use super::{EntityDef, RelationDef};
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned snapshot of the entire schema.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing).
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions. Names are unique per source entity.
    pub relations: Vec<RelationDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: crate::storage::current_timestamp(),
            entities: HashMap::new(),
            relations: Vec::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get the relation navigable as `field` on `entity`.
    pub fn get_relation(&self, entity: &str, field: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.from_entity == entity && r.name == field)
    }

    /// Get all relations for an entity (as source).
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.from_entity == entity)
            .collect()
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Check that every reference in the schema resolves.
    pub fn validate(&self) -> Result<(), Error> {
        for entity in self.entities.values() {
            if entity.get_identity_field().is_none() {
                return Err(Error::InvalidSchema(format!(
                    "entity '{}' does not declare its identity field '{}'",
                    entity.name, entity.identity_field
                )));
            }
        }

        for (i, relation) in self.relations.iter().enumerate() {
            let from = self.require_entity(&relation.from_entity, &relation.name)?;
            let to = self.require_entity(&relation.to_entity, &relation.name)?;

            if from.get_field(&relation.name).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "relation '{}.{}' shadows a scalar field",
                    from.name, relation.name
                )));
            }
            if self.relations[..i]
                .iter()
                .any(|r| r.from_entity == relation.from_entity && r.name == relation.name)
            {
                return Err(Error::InvalidSchema(format!(
                    "relation '{}.{}' is defined twice",
                    from.name, relation.name
                )));
            }
            Self::require_field(from, &relation.from_field)?;
            Self::require_field(to, &relation.to_field)?;

            match &relation.edge {
                Some(edge) => {
                    let edge_entity = self.require_entity(&edge.entity, &relation.name)?;
                    Self::require_field(edge_entity, &edge.source_field)?;
                    Self::require_field(edge_entity, &edge.target_field)?;
                }
                None if relation.is_many_to_many() => {
                    return Err(Error::InvalidSchema(format!(
                        "many-to-many relation '{}.{}' has no edge entity",
                        from.name, relation.name
                    )));
                }
                None => {}
            }

            if let super::CollectionKind::Map { key } = &relation.collection {
                Self::require_field(to, key)?;
            }
        }

        Ok(())
    }

    fn require_entity(&self, name: &str, relation: &str) -> Result<&EntityDef, Error> {
        self.get_entity(name).ok_or_else(|| {
            Error::InvalidSchema(format!(
                "relation '{}' references unknown entity '{}'",
                relation, name
            ))
        })
    }

    fn require_field(entity: &EntityDef, field: &str) -> Result<(), Error> {
        match entity.get_field(field) {
            Some(_) => Ok(()),
            None => Err(Error::InvalidSchema(format!(
                "entity '{}' has no field '{}'",
                entity.name, field
            ))),
        }
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}
