//! Repository configuration.

use pathquery_core::StorageConfig;
use pathquery_proto::{JoinKind, DEFAULT_PAGE_SIZE};

/// Repository configuration.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Storage engine configuration.
    pub storage: StorageConfig,

    /// Page size used by `find_page` when a request carries no page.
    pub default_page_size: u64,

    /// Join type of requests created with `Repository::query`.
    pub default_join_kind: JoinKind,
}

impl RepositoryConfig {
    /// Create a configuration storing data at `path`.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self::with_storage(StorageConfig::new(path))
    }

    /// Create a configuration around an existing storage configuration.
    pub fn with_storage(storage: StorageConfig) -> Self {
        Self {
            storage,
            default_page_size: DEFAULT_PAGE_SIZE,
            default_join_kind: JoinKind::default(),
        }
    }

    /// Create a configuration backed by a temporary database.
    pub fn temporary() -> Self {
        Self::with_storage(StorageConfig::temporary())
    }

    /// Set the default page size.
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the default join type.
    pub fn with_default_join_kind(mut self, kind: JoinKind) -> Self {
        self.default_join_kind = kind;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.default_page_size == 0 {
            return Err("default page size must be at least 1".into());
        }
        if !self.storage.temporary && self.storage.path.as_os_str().is_empty() {
            return Err("storage path is empty".into());
        }
        Ok(())
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::with_storage(StorageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepositoryConfig::temporary();
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.default_join_kind, JoinKind::Left);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = RepositoryConfig::temporary().with_default_page_size(0);
        assert!(config.validate().is_err());

        let config = RepositoryConfig::new("");
        assert!(config.validate().is_err());
    }
}
