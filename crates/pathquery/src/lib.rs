//! pathquery - path-addressed find queries over an embedded entity store.
//!
//! A [`Repository`] opens a sled-backed store, holds its schema catalog and
//! runs find requests: whole entities or projections of dotted field paths,
//! filtered by [`Condition`] trees, sorted and optionally paged.
//!
//! ```no_run
//! use pathquery::{Condition, Repository, RepositoryConfig, Sort};
//!
//! let repo = Repository::open(RepositoryConfig::new("./data"))?;
//! let request = repo
//!     .query("Employee")
//!     .with_field("phones.number")
//!     .with_condition(Condition::field("salary").greater_than(20.0))
//!     .sort_by(Sort::desc("salary"));
//! let employees = repo.find_all(request)?;
//! # Ok::<(), pathquery::Error>(())
//! ```

mod config;
mod error;
mod repository;

pub use config::RepositoryConfig;
pub use error::{Error, Result};
pub use repository::Repository;

pub use pathquery_core::{
    Cardinality, Catalog, CollectionKind, EdgeDef, EntityDef, FetchMode, FieldDef, FieldType,
    RelationDef, ScalarType, SchemaBundle, StorageConfig,
};
pub use pathquery_proto::{
    Condition, Entity, FindQuery, JoinKind, Page, PageRequest, Relation, RelationValue, Sort,
    SortDirection, Value,
};
