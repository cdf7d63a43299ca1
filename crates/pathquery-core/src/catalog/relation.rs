//! Relation definitions between entities.
//!
//! A relation is a navigable field on its source entity. Rows relate when
//! `source[from_field] == target[to_field]`, or, for many-to-many relations,
//! through an edge entity holding both sides.

use rkyv::{Archive, Deserialize, Serialize};

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Cardinality {
    /// One-to-one relation (unique foreign key).
    OneToOne,
    /// Many-to-one relation (foreign key on the source side).
    ManyToOne,
    /// One-to-many relation (foreign key on many side).
    OneToMany,
    /// Many-to-many relation (requires edge/join entity).
    ManyToMany,
}

/// Container type of a to-many relation field.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Ordered, in row order.
    List,
    /// Unordered, unique by identity.
    Set,
    /// Keyed by a scalar field of the related entity.
    Map {
        /// Field of the related entity used as map key.
        key: String,
    },
}

/// When a relation is populated on whole-entity reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum FetchMode {
    /// Left unloaded unless a path asks for it.
    Lazy,
    /// To-one relations are loaded one level deep with the owning entity.
    Eager,
}

/// Edge entity linking both sides of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct EdgeDef {
    /// Edge entity name.
    pub entity: String,
    /// Edge field matching the source's `from_field`.
    pub source_field: String,
    /// Edge field matching the target's `to_field`.
    pub target_field: String,
}

/// A relation definition between two entities.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct RelationDef {
    /// Field name on the source entity.
    pub name: String,
    /// Source entity name.
    pub from_entity: String,
    /// Target entity name.
    pub to_entity: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Join field on the source entity.
    pub from_field: String,
    /// Join field on the target entity.
    pub to_field: String,
    /// Edge entity for many-to-many relations.
    pub edge: Option<EdgeDef>,
    /// Container type for to-many relations.
    pub collection: CollectionKind,
    /// Fetch mode.
    pub fetch: FetchMode,
}

impl EdgeDef {
    /// Create an edge definition.
    pub fn new(
        entity: impl Into<String>,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            source_field: source_field.into(),
            target_field: target_field.into(),
        }
    }
}

impl RelationDef {
    fn build(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            cardinality,
            from_field: from_field.into(),
            to_field: to_field.into(),
            edge: None,
            collection: CollectionKind::List,
            fetch: FetchMode::Lazy,
        }
    }

    /// Create a one-to-one relation.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::build(
            name,
            from_entity,
            from_field,
            to_entity,
            to_field,
            Cardinality::OneToOne,
        )
    }

    /// Create a many-to-one relation.
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::build(
            name,
            from_entity,
            from_field,
            to_entity,
            to_field,
            Cardinality::ManyToOne,
        )
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::build(
            name,
            from_entity,
            from_field,
            to_entity,
            to_field,
            Cardinality::OneToMany,
        )
    }

    /// Create a many-to-many relation.
    pub fn many_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
        edge: EdgeDef,
    ) -> Self {
        let mut relation = Self::build(
            name,
            from_entity,
            from_field,
            to_entity,
            to_field,
            Cardinality::ManyToMany,
        );
        relation.edge = Some(edge);
        relation
    }

    /// Set the container type.
    pub fn with_collection(mut self, collection: CollectionKind) -> Self {
        self.collection = collection;
        self
    }

    /// Collect into a set.
    pub fn as_set(self) -> Self {
        self.with_collection(CollectionKind::Set)
    }

    /// Collect into a map keyed by a field of the related entity.
    pub fn keyed_by(self, key: impl Into<String>) -> Self {
        self.with_collection(CollectionKind::Map { key: key.into() })
    }

    /// Load with the owning entity.
    pub fn eager(mut self) -> Self {
        self.fetch = FetchMode::Eager;
        self
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }

    /// Check if the relation yields a collection.
    pub fn is_to_many(&self) -> bool {
        matches!(
            self.cardinality,
            Cardinality::OneToMany | Cardinality::ManyToMany
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_one_relations() {
        let rel = RelationDef::many_to_one("manager", "Employee", "manager_id", "Employee", "id")
            .eager();

        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
        assert!(!rel.is_to_many());
        assert_eq!(rel.fetch, FetchMode::Eager);

        let rel = RelationDef::one_to_one("address", "Employee", "address_id", "Address", "id");
        assert_eq!(rel.fetch, FetchMode::Lazy);
        assert!(rel.edge.is_none());
    }

    #[test]
    fn test_one_to_many_relation() {
        let rel = RelationDef::one_to_many("phones", "Employee", "id", "Phone", "owner_id")
            .keyed_by("type");

        assert!(rel.is_to_many());
        assert_eq!(
            rel.collection,
            CollectionKind::Map {
                key: "type".into()
            }
        );
    }

    #[test]
    fn test_many_to_many_relation() {
        let rel = RelationDef::many_to_many(
            "projects",
            "Employee",
            "id",
            "Project",
            "id",
            EdgeDef::new("EmployeeProject", "employee_id", "project_id"),
        )
        .as_set();

        assert!(rel.is_many_to_many());
        assert_eq!(rel.collection, CollectionKind::Set);
        assert_eq!(rel.edge.map(|e| e.entity), Some("EmployeeProject".to_string()));
    }
}
