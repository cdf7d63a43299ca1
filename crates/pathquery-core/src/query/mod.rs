//! Path-addressed query engine.
//!
//! Find requests name fields by dotted paths (`phones.number`,
//! `manager.address.city`, `metadata->color`). This module resolves those
//! paths into joins, compiles conditions and sort keys, runs the resulting
//! select through a [`QueryBackend`] and rebuilds entity graphs from the
//! rows.

mod alias;
mod backend;
mod coerce;
mod compiler;
mod context;
mod criteria;
mod eval;
mod executor;
mod field_path;
mod handler;
mod materializer;
mod page;
mod predicate;
mod resolver;
mod row;
mod sort;

#[cfg(test)]
mod test_support;

pub use alias::{AliasRegistry, ALIAS_SUFFIX};
pub use backend::QueryBackend;
pub use coerce::{coerce, coerce_scalar};
pub use compiler::{execute, CompiledQuery, QueryCompiler};
pub use context::QueryContext;
pub use criteria::{
    ArithmeticOp, Column, Expr, JoinNode, NodeId, OrderExpr, Predicate, SelectQuery, Selection,
    ROOT_NODE,
};
pub use eval::{compare_values, escape_like, like_match, sort_order, values_equal};
pub use executor::QueryExecutor;
pub use field_path::{FieldPath, FieldPathTree};
pub use handler::{FindAllHandler, FindOneHandler, FindPageHandler};
pub use materializer::ResultMaterializer;
pub use page::PageWindower;
pub use predicate::PredicateBuilder;
pub use resolver::{PathResolver, Resolved, ARROW};
pub use row::{Datum, ResultSet, Tuple, ROOT_ALIAS};
pub use sort::SortCompiler;
