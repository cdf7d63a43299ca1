//! Find handlers: the entry points that run a [`FindQuery`] end to end.

use super::backend::QueryBackend;
use super::compiler::{execute, QueryCompiler};
use super::materializer::ResultMaterializer;
use super::page::PageWindower;
use crate::error::Error;
use pathquery_proto::{Entity, FindQuery, Page, PageRequest};
use tracing::instrument;

/// Returns every matching entity.
///
/// The request's page is ignored; use [`FindPageHandler`] to page.
pub struct FindAllHandler<'a, B: QueryBackend + ?Sized> {
    backend: &'a B,
    request: FindQuery,
}

impl<'a, B: QueryBackend + ?Sized> FindAllHandler<'a, B> {
    pub fn new(backend: &'a B, request: FindQuery) -> Self {
        Self { backend, request }
    }

    #[instrument(skip(self), fields(entity = %self.request.entity))]
    pub fn execute(&self) -> Result<Vec<Entity>, Error> {
        let catalog = self.backend.catalog();
        let compiled = QueryCompiler::new(catalog).compile(&self.request)?;
        let results = execute(self.backend, &compiled.query)?;
        ResultMaterializer::new(catalog).materialize(&compiled, results)
    }
}

/// Returns the first matching entity, if any.
///
/// By default the first entity of page 0 with size 1 is returned, so the
/// result is well defined when the request joins to-many relations. When the
/// caller knows at most one entity matches, [`sure_max_one_result`] skips
/// the paging queries.
///
/// [`sure_max_one_result`]: FindOneHandler::sure_max_one_result
pub struct FindOneHandler<'a, B: QueryBackend + ?Sized> {
    backend: &'a B,
    request: FindQuery,
    max_one: bool,
}

impl<'a, B: QueryBackend + ?Sized> FindOneHandler<'a, B> {
    pub fn new(backend: &'a B, request: FindQuery) -> Self {
        Self {
            backend,
            request,
            max_one: false,
        }
    }

    /// Fetch with a single unpaged query and take the first entity.
    pub fn sure_max_one_result(mut self) -> Self {
        self.max_one = true;
        self
    }

    #[instrument(skip(self), fields(entity = %self.request.entity, max_one = self.max_one))]
    pub fn execute(&self) -> Result<Option<Entity>, Error> {
        if self.max_one {
            let all = FindAllHandler::new(self.backend, self.request.clone()).execute()?;
            return Ok(all.into_iter().next());
        }

        let request = self.request.clone().with_page(PageRequest::of(0, 1));
        let page = PageWindower::new(self.backend).find_page(&request)?;
        Ok(page.content.into_iter().next())
    }
}

/// Returns one page of matching entities with the total count.
pub struct FindPageHandler<'a, B: QueryBackend + ?Sized> {
    backend: &'a B,
    request: FindQuery,
}

impl<'a, B: QueryBackend + ?Sized> FindPageHandler<'a, B> {
    pub fn new(backend: &'a B, request: FindQuery) -> Self {
        Self { backend, request }
    }

    #[instrument(skip(self), fields(entity = %self.request.entity))]
    pub fn execute(&self) -> Result<Page<Entity>, Error> {
        PageWindower::new(self.backend).find_page(&self.request)
    }
}
