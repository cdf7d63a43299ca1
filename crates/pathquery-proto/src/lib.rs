//! pathquery request and value types.
//!
//! This crate defines what a caller hands to the query engine and what it
//! gets back, independent of storage.
//!
//! # Modules
//!
//! - [`value`] - Runtime values and their hashable keys
//! - [`entity`] - Entity graph objects with explicit relation load state
//! - [`condition`] - Predicate trees over dotted field paths
//! - [`sort`] - Sort keys, including arithmetic expressions of paths
//! - [`page`] - Page requests and page results
//! - [`query`] - The find request itself
//! - [`error`] - Request-level errors

pub mod condition;
pub mod entity;
pub mod error;
pub mod page;
pub mod query;
pub mod sort;
pub mod value;

pub use condition::{
    CompareOp, CompositeCondition, Condition, EntityRef, FieldCondition, Junction, Operand,
};
pub use entity::{Entity, FieldSlot, Relation, RelationValue};
pub use error::Error;
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE};
pub use query::{FindQuery, JoinKind};
pub use sort::{Sort, SortDirection};
pub use value::{Key, Value};
