//! Find request compilation.
//!
//! A [`FindQuery`] goes through a fixed pipeline: a context is opened for the
//! root entity, requested paths become aliased columns, the condition becomes
//! the filter and sort keys become the ordering. The result is one
//! [`SelectQuery`] plus the column map the materializer needs to rebuild the
//! entity graph.

use super::backend::QueryBackend;
use super::context::QueryContext;
use super::criteria::{Column, Expr, SelectQuery, Selection, ROOT_NODE};
use super::field_path::FieldPathTree;
use super::predicate::PredicateBuilder;
use super::resolver::{PathResolver, ARROW};
use super::row::{ResultSet, ROOT_ALIAS};
use super::sort::SortCompiler;
use crate::catalog::Catalog;
use crate::error::Error;
use pathquery_proto::{Condition, FindQuery, Sort};
use tracing::debug;

/// A compiled find request.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// The statement to execute.
    pub query: SelectQuery,
    /// Requested paths.
    pub tree: FieldPathTree,
    /// `(path, alias)` per projected path, in column order.
    pub columns: Vec<(String, String)>,
}

impl CompiledQuery {
    /// Column alias of a projected path.
    pub fn alias_of(&self, path: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, alias)| alias.as_str())
    }
}

/// Compiles find requests against a catalog.
pub struct QueryCompiler<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Open a context for the request's entity and join type.
    pub fn context(&self, request: &FindQuery) -> Result<QueryContext<'a>, Error> {
        QueryContext::new(self.catalog, &request.entity, request.join_kind)
    }

    /// Compile a request into a single select.
    ///
    /// The request's page, if any, is not applied here; paging needs several
    /// statements and is handled by the page windower.
    pub fn compile(&self, request: &FindQuery) -> Result<CompiledQuery, Error> {
        let tree = FieldPathTree::from_paths(&request.fields);
        let mut ctx = self.context(request)?;

        let columns = Self::select_paths(&mut ctx, &tree)?;
        Self::apply_filter(&mut ctx, request.condition.as_ref())?;
        Self::apply_order(&mut ctx, &request.sort)?;

        let query = ctx.into_query();
        debug!(
            entity = %query.root,
            columns = columns.len(),
            joins = query.joins.len(),
            "compiled find query"
        );
        Ok(CompiledQuery {
            query,
            tree,
            columns,
        })
    }

    /// Project the flattened paths of `tree`.
    ///
    /// With no paths the query returns whole root entities. Otherwise the
    /// root is returned as [`ROOT_ALIAS`] followed by one column per path.
    pub fn select_paths(
        ctx: &mut QueryContext<'_>,
        tree: &FieldPathTree,
    ) -> Result<Vec<(String, String)>, Error> {
        let paths = tree.flatten();
        if paths.is_empty() {
            ctx.query.selection = Selection::Root;
            return Ok(Vec::new());
        }

        let mut columns = vec![Column {
            expr: Expr::Entity(ROOT_NODE),
            alias: ROOT_ALIAS.to_string(),
        }];
        let mut mapping = Vec::with_capacity(paths.len());
        for path in paths {
            if path.contains(ARROW) {
                return Err(Error::path(
                    path.as_str(),
                    ARROW,
                    "document pointers cannot be projected",
                ));
            }
            let resolved = PathResolver::resolve(ctx, &path)?;
            let alias = ctx.aliases.alias(&path);
            columns.push(Column {
                expr: resolved.expr(),
                alias: alias.clone(),
            });
            mapping.push((path, alias));
        }

        ctx.query.selection = Selection::Columns(columns);
        Ok(mapping)
    }

    /// AND the compiled condition into the filter.
    pub fn apply_filter(
        ctx: &mut QueryContext<'_>,
        condition: Option<&Condition>,
    ) -> Result<(), Error> {
        if let Some(condition) = condition {
            let predicate = PredicateBuilder::compile(ctx, condition)?;
            ctx.query.and_filter(predicate);
        }
        Ok(())
    }

    /// Append the compiled sort keys to the ordering.
    pub fn apply_order(ctx: &mut QueryContext<'_>, sorts: &[Sort]) -> Result<(), Error> {
        let order = SortCompiler::compile(ctx, sorts)?;
        ctx.query.order_by.extend(order);
        Ok(())
    }
}

/// Run a query, reporting any backend failure as [`Error::Execution`].
pub fn execute<B: QueryBackend + ?Sized>(
    backend: &B,
    query: &SelectQuery,
) -> Result<ResultSet, Error> {
    backend.execute(query).map_err(|e| match e {
        Error::Execution(_) => e,
        other => Error::Execution(other.to_string()),
    })
}
