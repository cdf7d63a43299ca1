//! Catalog manager for storing and retrieving schema metadata.

use super::{EntityDef, EntityDescriptor, RelationDef, SchemaBundle};
use crate::error::Error;
use dashmap::DashMap;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Tree name for schema bundles.
const SCHEMA_TREE: &str = "catalog:schemas";

/// Tree name for catalog metadata.
const META_TREE: &str = "catalog:meta";

/// Key for current schema version in meta tree.
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// The catalog manager for schema metadata.
///
/// Entity descriptors are derived lazily from the current schema and cached
/// until the next [`apply_schema`](Self::apply_schema). Concurrent builders of
/// the same descriptor race benignly: the first one stored wins.
pub struct Catalog {
    /// Schema bundles tree.
    schema_tree: Tree,
    /// Metadata tree.
    meta_tree: Tree,
    /// Current schema version (cached).
    current_version: AtomicU64,
    /// Current schema (cached).
    current_schema: RwLock<Option<SchemaBundle>>,
    /// Descriptor cache keyed by entity name.
    descriptors: DashMap<String, Arc<EntityDescriptor>>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let schema_tree = db.open_tree(SCHEMA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        let current_version = match meta_tree.get(CURRENT_VERSION_KEY)? {
            Some(bytes) => {
                let buf: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| Error::InvalidData("corrupt schema version".into()))?;
                u64::from_be_bytes(buf)
            }
            None => 0,
        };

        let catalog = Self {
            schema_tree,
            meta_tree,
            current_version: AtomicU64::new(current_version),
            current_schema: RwLock::new(None),
            descriptors: DashMap::new(),
        };

        if current_version > 0 {
            if let Some(schema) = catalog.schema_at_version(current_version)? {
                *catalog.current_schema.write() = Some(schema);
            }
        }

        Ok(catalog)
    }

    /// Get the current schema version.
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get the current schema bundle.
    pub fn current_schema(&self) -> Option<SchemaBundle> {
        self.current_schema.read().clone()
    }

    /// Get a schema bundle at a specific version.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        match self.schema_tree.get(version.to_be_bytes())? {
            Some(bytes) => Ok(Some(SchemaBundle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Validate and apply a new schema bundle.
    ///
    /// Returns the new version number.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        bundle.validate()?;

        let new_version = self.current_version() + 1;
        bundle.version = new_version;

        let value = bundle.to_bytes()?;
        self.schema_tree.insert(new_version.to_be_bytes(), value)?;
        self.meta_tree
            .insert(CURRENT_VERSION_KEY, &new_version.to_be_bytes())?;

        self.current_version.store(new_version, Ordering::SeqCst);
        *self.current_schema.write() = Some(bundle);
        self.descriptors.clear();

        debug!(version = new_version, "applied schema");
        Ok(new_version)
    }

    /// Get an entity definition by name from the current schema.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        let guard = self.current_schema.read();
        guard.as_ref().and_then(|s| s.get_entity(name).cloned())
    }

    /// Get the relation navigable as `field` on `entity`.
    pub fn get_relation(&self, entity: &str, field: &str) -> Option<RelationDef> {
        let guard = self.current_schema.read();
        guard
            .as_ref()
            .and_then(|s| s.get_relation(entity, field).cloned())
    }

    /// List all entity names in the current schema.
    pub fn list_entities(&self) -> Vec<String> {
        let guard = self.current_schema.read();
        guard
            .as_ref()
            .map(|s| s.entity_names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Get the descriptor for an entity type, building it on first use.
    pub fn descriptor(&self, name: &str) -> Result<Arc<EntityDescriptor>, Error> {
        if let Some(cached) = self.descriptors.get(name) {
            return Ok(Arc::clone(cached.value()));
        }

        let built = {
            let guard = self.current_schema.read();
            let schema = guard
                .as_ref()
                .ok_or_else(|| Error::UnknownEntity(name.to_string()))?;
            EntityDescriptor::from_schema(schema, name)?
        };

        let entry = self
            .descriptors
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(built));
        Ok(Arc::clone(entry.value()))
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.schema_tree.flush()?;
        self.meta_tree.flush()?;
        Ok(())
    }
}
