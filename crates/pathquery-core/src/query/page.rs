//! Paged find queries.
//!
//! Paging a query that joins to-many relations cannot put OFFSET/LIMIT on
//! the joined rows. A page is computed in three steps instead:
//!
//! 1. **Window**: a DISTINCT query of root identities under the caller's
//!    condition and ordering, with the page's offset and limit applied.
//! 2. **Fetch**: the normal compiled query restricted to the window's
//!    identities, materialized and put back in window order.
//! 3. **Count**: the number of distinct root identities matching the
//!    condition, skipped when a short page already determines it.

use super::backend::QueryBackend;
use super::compiler::{execute, QueryCompiler};
use super::criteria::{Column, OrderExpr, Selection};
use super::materializer::ResultMaterializer;
use super::row::{Datum, ResultSet};
use super::sort::SortCompiler;
use crate::error::Error;
use pathquery_proto::{
    Condition, Entity, FindQuery, Key, Page, PageRequest, SortDirection, Value,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Runs paged find queries against a backend.
pub struct PageWindower<'a, B: QueryBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: QueryBackend + ?Sized> PageWindower<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Find one page. Uses the request's page, or the first page of the
    /// default size.
    pub fn find_page(&self, request: &FindQuery) -> Result<Page<Entity>, Error> {
        let page = request.page.unwrap_or_default();
        let window = self.window(request, page)?;

        let content = if window.is_empty() {
            Vec::new()
        } else {
            self.fetch(request, &window)?
        };
        let total = match derived_total(page, window.len() as u64) {
            Some(total) => total,
            None => self.count(request)?,
        };

        debug!(
            entity = %request.entity,
            page = page.page(),
            size = page.size(),
            total,
            "fetched page"
        );
        Ok(Page::new(content, page, total))
    }

    /// Ordered, distinct root identities of one page.
    pub fn window(&self, request: &FindQuery, page: PageRequest) -> Result<Vec<Value>, Error> {
        let compiler = QueryCompiler::new(self.backend.catalog());
        let mut ctx = compiler.context(request)?;
        QueryCompiler::apply_filter(&mut ctx, request.condition.as_ref())?;

        // Identity ascending is the default order and the final tie-break.
        let mut order = SortCompiler::compile(&mut ctx, &request.sort)?;
        let identity = ctx.root_identity();
        if !order.iter().any(|o| o.expr == identity) {
            order.push(OrderExpr {
                expr: identity.clone(),
                direction: SortDirection::Asc,
            });
        }

        let identity_field = ctx.root().identity.clone();
        let alias = ctx.aliases.alias(&identity_field);
        ctx.query.selection = Selection::Columns(vec![Column {
            expr: identity,
            alias: alias.clone(),
        }]);
        ctx.query.order_by = order;
        ctx.query.distinct = true;
        ctx.query.offset = Some(page.offset());
        ctx.query.limit = Some(page.size());

        let ids = match execute(self.backend, &ctx.into_query())? {
            ResultSet::Tuples(tuples) => {
                let mut seen = HashSet::new();
                tuples
                    .iter()
                    .filter_map(|t| t.get(&alias).and_then(Datum::as_value).cloned())
                    .filter(|id| id.key().is_some_and(|key| seen.insert(key)))
                    .collect::<Vec<_>>()
            }
            other => return Err(unexpected("identity window", &other)),
        };

        trace!(entity = %request.entity, ids = ?ids, "page window");
        Ok(ids)
    }

    /// Load the entities of a window, in window order.
    pub fn fetch(&self, request: &FindQuery, window: &[Value]) -> Result<Vec<Entity>, Error> {
        let catalog = self.backend.catalog();
        let descriptor = catalog.descriptor(&request.entity)?;
        let restricted = FindQuery {
            condition: Some(Condition::and([
                request.condition.clone(),
                Condition::field(descriptor.identity.clone()).in_values(window.iter().cloned()),
            ])),
            page: None,
            ..request.clone()
        };

        let compiled = QueryCompiler::new(catalog).compile(&restricted)?;
        let results = execute(self.backend, &compiled.query)?;
        let mut entities = ResultMaterializer::new(catalog).materialize(&compiled, results)?;

        let positions: HashMap<Key, usize> = window
            .iter()
            .enumerate()
            .filter_map(|(i, id)| id.key().map(|key| (key, i)))
            .collect();
        entities.sort_by_key(|e| {
            e.id.key()
                .and_then(|key| positions.get(&key).copied())
                .unwrap_or(usize::MAX)
        });
        Ok(entities)
    }

    /// Number of distinct root entities matching the request's condition.
    pub fn count(&self, request: &FindQuery) -> Result<u64, Error> {
        let compiler = QueryCompiler::new(self.backend.catalog());
        let mut ctx = compiler.context(request)?;
        QueryCompiler::apply_filter(&mut ctx, request.condition.as_ref())?;
        ctx.query.selection = Selection::CountDistinct(ctx.root_identity());

        match execute(self.backend, &ctx.into_query())? {
            ResultSet::Count(count) => Ok(count),
            other => Err(unexpected("count", &other)),
        }
    }
}

/// Total implied by a page's size alone, if any.
///
/// A short first page holds everything; a short later page ends the result.
/// An empty or full page says nothing.
fn derived_total(page: PageRequest, window: u64) -> Option<u64> {
    if window >= page.size() {
        return None;
    }
    if page.offset() == 0 {
        return Some(window);
    }
    if window > 0 {
        return Some(page.offset() + window);
    }
    None
}

fn unexpected(phase: &str, result: &ResultSet) -> Error {
    let kind = match result {
        ResultSet::Entities(_) => "entities",
        ResultSet::Tuples(_) => "tuples",
        ResultSet::Count(_) => "a count",
    };
    Error::Execution(format!("{} query returned {}", phase, kind))
}
