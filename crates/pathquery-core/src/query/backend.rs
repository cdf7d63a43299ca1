//! Persistence boundary of the query engine.

use super::criteria::SelectQuery;
use super::row::ResultSet;
use crate::catalog::Catalog;
use crate::error::Error;

/// A store that can run compiled select queries.
///
/// The compiler only needs entity metadata and the ability to execute one
/// [`SelectQuery`] at a time; connection and transaction handling stay on the
/// implementor's side.
pub trait QueryBackend {
    /// Entity metadata the queries are compiled against.
    fn catalog(&self) -> &Catalog;

    /// Execute a query.
    fn execute(&self, query: &SelectQuery) -> Result<ResultSet, Error>;
}
