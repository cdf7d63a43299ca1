//! pathquery core - catalog, storage and the path-addressed query engine.
//!
//! This crate resolves dotted field paths against the catalog, compiles find
//! requests into select queries, executes them against the sled row store
//! and materializes entity graphs, including paged results.

pub mod catalog;
pub mod error;
pub mod query;
pub mod storage;

pub use catalog::{
    Cardinality, Catalog, CollectionKind, EdgeDef, EntityDef, FetchMode, FieldDef, FieldType,
    RelationDef, ScalarType, SchemaBundle,
};
pub use error::Error;
pub use query::{
    FindAllHandler, FindOneHandler, FindPageHandler, PageWindower, QueryBackend, QueryCompiler,
    QueryExecutor, ResultMaterializer,
};
pub use storage::{StorageConfig, StorageEngine};

/// Re-export protocol types.
pub use pathquery_proto as proto;
