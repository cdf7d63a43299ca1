//! Embedded repository combining the store, the catalog and the find handlers.

use std::collections::BTreeMap;

use pathquery_core::{
    Catalog, FindAllHandler, FindOneHandler, FindPageHandler, QueryExecutor, SchemaBundle,
    StorageEngine,
};
use pathquery_proto::{Condition, Entity, FindQuery, Page, PageRequest, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RepositoryConfig;
use crate::error::{Error, Result};

/// An opened store with its catalog.
pub struct Repository {
    storage: StorageEngine,
    catalog: Catalog,
    config: RepositoryConfig,
}

impl Repository {
    /// Open a repository.
    pub fn open(config: RepositoryConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let storage = StorageEngine::open(config.storage.clone())?;
        let catalog = Catalog::open(storage.db())?;
        info!(
            path = %config.storage.path.display(),
            schema_version = catalog.current_version(),
            recovered = storage.was_recovered(),
            "opened repository"
        );

        Ok(Self {
            storage,
            catalog,
            config,
        })
    }

    /// Open a repository backed by a temporary database.
    pub fn temporary() -> Result<Self> {
        Self::open(RepositoryConfig::temporary())
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Create a query executor for this repository.
    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.storage, &self.catalog)
    }

    /// Install a new schema version. Returns the applied version.
    pub fn apply_schema(&self, bundle: SchemaBundle) -> Result<u64> {
        Ok(self.catalog.apply_schema(bundle)?)
    }

    /// Insert or replace a record. The identity is taken from the record's
    /// identity field and returned.
    pub fn insert(&self, entity: &str, fields: BTreeMap<String, Value>) -> Result<Value> {
        let descriptor = self.catalog.descriptor(entity)?;
        let id = match fields.get(&descriptor.identity) {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                return Err(Error::MissingIdentity {
                    entity: entity.to_string(),
                    field: descriptor.identity.clone(),
                })
            }
        };

        self.storage.put(entity, &id, &fields)?;
        debug!(entity, id = ?id, "inserted record");
        Ok(id)
    }

    /// Start a request using the configured join type.
    pub fn query(&self, entity: impl Into<String>) -> FindQuery {
        FindQuery::new(entity).with_join_kind(self.config.default_join_kind)
    }

    pub fn find_all(&self, request: FindQuery) -> Result<Vec<Entity>> {
        Ok(FindAllHandler::new(&self.executor(), request).execute()?)
    }

    /// First entity of the request's order, if any.
    pub fn find_one(&self, request: FindQuery) -> Result<Option<Entity>> {
        Ok(FindOneHandler::new(&self.executor(), request).execute()?)
    }

    /// Like [`find_one`](Self::find_one) for requests that match at most
    /// one entity; skips the paging queries.
    pub fn find_unique(&self, request: FindQuery) -> Result<Option<Entity>> {
        Ok(FindOneHandler::new(&self.executor(), request)
            .sure_max_one_result()
            .execute()?)
    }

    /// One page of entities. A request without a page gets the first page of
    /// the configured default size.
    pub fn find_page(&self, request: FindQuery) -> Result<Page<Entity>> {
        let request = match request.page {
            Some(_) => request,
            None => {
                let size = i64::try_from(self.config.default_page_size).unwrap_or(i64::MAX);
                request.with_page(PageRequest::first(size))
            }
        };
        Ok(FindPageHandler::new(&self.executor(), request).execute()?)
    }

    /// Find an entity by identity, projecting `fields`.
    ///
    /// String identities that parse as a UUID are looked up as UUIDs.
    pub fn find_by_id<I, S>(
        &self,
        entity: &str,
        id: impl Into<Value>,
        fields: I,
    ) -> Result<Option<Entity>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptor = self.catalog.descriptor(entity)?;
        let id = match id.into() {
            Value::String(s) => match Uuid::parse_str(&s) {
                Ok(uuid) => Value::from(uuid),
                Err(_) => Value::String(s),
            },
            other => other,
        };

        let request = self
            .query(entity)
            .with_fields(fields)
            .with_condition(Condition::field(descriptor.identity.clone()).equal(id));
        self.find_unique(request)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()?;
        self.catalog.flush()?;
        Ok(())
    }
}
