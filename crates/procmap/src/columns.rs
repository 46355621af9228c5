//! Column-name cache keyed by query signature.

use crate::once_map::OnceMap;
use std::sync::{Arc, OnceLock};

/// Ordered column names of one result set.
pub type ColumnNames = Arc<[String]>;

/// Caches the column list a command returns, per result set, so the schema is
/// derived once per signature instead of on every call.
#[derive(Debug)]
pub struct ColumnNameCache {
    entries: OnceMap<(String, usize), ColumnNames>,
}

impl Default for ColumnNameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnNameCache {
    pub fn new() -> Self {
        Self {
            entries: OnceMap::new(),
        }
    }

    /// The process-wide cache used by the mappers.
    pub fn global() -> &'static ColumnNameCache {
        static GLOBAL: OnceLock<ColumnNameCache> = OnceLock::new();
        GLOBAL.get_or_init(ColumnNameCache::new)
    }

    /// Column names for result set `index` of `signature`.
    ///
    /// `derive` reads the names from the live cursor; it runs only on a miss, or
    /// every time when `bypass` is set (in which case nothing is stored).
    pub fn resolve(
        &self,
        signature: &str,
        index: usize,
        bypass: bool,
        derive: impl FnOnce() -> Vec<String>,
    ) -> ColumnNames {
        if bypass {
            return derive().into();
        }
        self.entries
            .get_or_init((signature.to_string(), index), || derive().into())
    }

    pub fn get(&self, signature: &str, index: usize) -> Option<ColumnNames> {
        self.entries.get(&(signature.to_string(), index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
