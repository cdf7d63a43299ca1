//! Semantic catalog for pathquery.
//!
//! The catalog stores entity and relation metadata, schema versions, and the
//! per-entity descriptors the query compiler resolves paths against.

mod catalog;
mod descriptor;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use catalog::Catalog;
pub use descriptor::{
    EntityDescriptor, FieldDescriptor, FieldKind, RelationDescriptor, RelationShape,
};
pub use entity::EntityDef;
pub use field::FieldDef;
pub use relation::{Cardinality, CollectionKind, EdgeDef, FetchMode, RelationDef};
pub use schema::SchemaBundle;
pub use types::{FieldType, ScalarType};
