//! Per-query compilation state.

use super::alias::AliasRegistry;
use super::criteria::{Expr, SelectQuery, ROOT_NODE};
use super::resolver::Resolved;
use crate::catalog::{Catalog, EntityDescriptor};
use crate::error::Error;
use pathquery_proto::JoinKind;
use std::collections::HashMap;
use std::sync::Arc;

/// State for compiling one query.
///
/// Holds the statement under construction, the cache of resolved path
/// prefixes (so sibling paths share joins) and the alias registry. A context
/// is never reused across queries.
pub struct QueryContext<'a> {
    catalog: &'a Catalog,
    root: Arc<EntityDescriptor>,
    join_kind: JoinKind,
    selections: HashMap<String, Resolved>,
    /// The statement under construction.
    pub query: SelectQuery,
    /// Column aliases allocated so far.
    pub aliases: AliasRegistry,
}

impl<'a> QueryContext<'a> {
    /// Start a query rooted at `entity`.
    pub fn new(catalog: &'a Catalog, entity: &str, join_kind: JoinKind) -> Result<Self, Error> {
        let root = catalog.descriptor(entity)?;
        Ok(Self {
            catalog,
            query: SelectQuery::new(root.name.clone()),
            root,
            join_kind,
            selections: HashMap::new(),
            aliases: AliasRegistry::new(),
        })
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Descriptor of the root entity.
    pub fn root(&self) -> &Arc<EntityDescriptor> {
        &self.root
    }

    /// Default join type for relation segments.
    pub fn join_kind(&self) -> JoinKind {
        self.join_kind
    }

    /// Identity attribute of the root entity.
    pub fn root_identity(&self) -> Expr {
        Expr::attribute(ROOT_NODE, self.root.identity.clone())
    }

    pub(crate) fn cached(&self, path: &str) -> Option<&Resolved> {
        self.selections.get(path)
    }

    pub(crate) fn remember(&mut self, path: String, resolved: Resolved) {
        self.selections.entry(path).or_insert(resolved);
    }

    /// Finish and return the statement.
    pub fn into_query(self) -> SelectQuery {
        self.query
    }
}
