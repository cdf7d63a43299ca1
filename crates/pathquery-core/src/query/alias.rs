//! Column aliases for projected paths.
//!
//! An alias is the dotted path with `.` replaced by `__` and the suffix token
//! `_p_` appended. Collisions within a query get further `_p_` tokens. The
//! root column is always [`ROOT_ALIAS`], which no path can produce since every
//! path alias ends in the suffix token.

use super::row::ROOT_ALIAS;
use std::collections::HashMap;

/// Suffix token appended to every path alias.
pub const ALIAS_SUFFIX: &str = "_p_";

const SEPARATOR: &str = "__";

/// Per-query alias allocation.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    by_path: HashMap<String, String>,
    by_alias: HashMap<String, String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for a path, allocating one on first use.
    pub fn alias(&mut self, path: &str) -> String {
        if let Some(existing) = self.by_path.get(path) {
            return existing.clone();
        }

        let mut alias = format!("{}{}", path.replace('.', SEPARATOR), ALIAS_SUFFIX);
        while alias == ROOT_ALIAS || self.by_alias.contains_key(&alias) {
            alias.push_str(ALIAS_SUFFIX);
        }

        self.by_path.insert(path.to_string(), alias.clone());
        self.by_alias.insert(alias.clone(), path.to_string());
        alias
    }

    /// Alias previously allocated for a path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    /// Exact path an alias was allocated for.
    pub fn path_of(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(String::as_str)
    }

    /// Recover a dotted path from an alias without the registry.
    ///
    /// Exact for paths that contain no `__` and do not end in the suffix
    /// token; use [`path_of`](Self::path_of) otherwise.
    pub fn dealias(alias: &str) -> String {
        let mut stem = alias;
        while let Some(stripped) = stem.strip_suffix(ALIAS_SUFFIX) {
            stem = stripped;
        }
        stem.replace(SEPARATOR, ".")
    }
}
