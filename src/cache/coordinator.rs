//! Cache coordinator for LayerDB
//!
//! Pairs the query-result cache with the table metadata cache and keeps the
//! hit/miss accounting. Only lookups in the query-result cache move the
//! counters; metadata lookups are free.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use super::lru::BoundedCache;
use crate::catalog::Column;
use crate::config::DatabaseConfig;
use crate::storage::Row;

/// Key of a cached query result: the table it reads plus a hash of the
/// verbatim statement text.
///
/// Two statements that differ only in whitespace or keyword case hash
/// differently and are cached independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    table: String,
    hash: u64,
}

impl QueryKey {
    pub fn new(table: impl Into<String>, sql: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        sql.hash(&mut hasher);
        Self {
            table: table.into(),
            hash: hasher.finish(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Table token of a rendered key
    fn table_of(key: &str) -> &str {
        key.rsplit_once('#').map_or(key, |(table, _)| table)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:016x}", self.table, self.hash)
    }
}

/// Column entry of a [`TableSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: String,
}

/// Cached description of a table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableSummary {
    pub columns: Vec<ColumnSummary>,
    /// Every column carries a secondary index
    pub indexed_columns: Vec<String>,
}

impl TableSummary {
    pub fn from_columns(columns: &[Column]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| ColumnSummary {
                    name: c.name.clone(),
                    data_type: c.data_type.clone(),
                })
                .collect(),
            indexed_columns: columns.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Percentage of query lookups that hit, 0 when nothing was looked up
    pub hit_rate: f64,
    pub query_cache_size: usize,
    pub metadata_cache_size: usize,
}

/// Query-result and table-metadata caches
#[derive(Debug)]
pub struct CacheCoordinator {
    query_cache: BoundedCache<Vec<Row>>,
    metadata_cache: BoundedCache<TableSummary>,
    query_ttl: Duration,
    metadata_ttl: Duration,
    hits: u64,
    misses: u64,
}

impl CacheCoordinator {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            query_cache: BoundedCache::new(config.cache_capacity),
            metadata_cache: BoundedCache::new(config.metadata_cache_capacity()),
            query_ttl: config.query_ttl,
            metadata_ttl: config.metadata_ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Raw rows cached for `key`, counting a hit or a miss
    pub fn get_query_result(&mut self, key: &QueryKey) -> Option<Vec<Row>> {
        match self.query_cache.get(&key.to_string()) {
            Some(rows) => {
                self.hits += 1;
                trace!(key = %key, "query cache hit");
                Some(rows.clone())
            }
            None => {
                self.misses += 1;
                trace!(key = %key, "query cache miss");
                None
            }
        }
    }

    pub fn cache_query_result(&mut self, key: &QueryKey, rows: Vec<Row>) {
        if let Some(evicted) = self.query_cache.put(key.to_string(), rows, self.query_ttl) {
            trace!(key = %evicted, "evicted query result");
        }
    }

    pub fn get_table_metadata(&mut self, table: &str) -> Option<TableSummary> {
        self.metadata_cache.get(table).cloned()
    }

    pub fn cache_table_metadata(&mut self, table: &str, summary: TableSummary) {
        self.metadata_cache.put(table, summary, self.metadata_ttl);
    }

    /// Drop every cached result reading `table`, and its metadata entry.
    ///
    /// Matching is on the exact table token, so invalidating `users` leaves
    /// results for `users_archive` alone. Returns the number of query
    /// results dropped.
    pub fn invalidate_table(&mut self, table: &str) -> usize {
        let dropped = self
            .query_cache
            .invalidate_where(|key| QueryKey::table_of(key) == table);
        self.metadata_cache.remove(table);
        debug!(table, dropped, "invalidated cached results");
        dropped
    }

    /// Drop everything from both caches
    pub fn clear(&mut self) {
        self.query_cache.invalidate(None);
        self.metadata_cache.invalidate(None);
    }

    /// Sweep expired entries out of both caches
    pub fn cleanup(&mut self) -> usize {
        self.query_cache.cleanup_expired() + self.metadata_cache.cleanup_expired()
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        };

        CacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            query_cache_size: self.query_cache.len(),
            metadata_cache_size: self.metadata_cache.len(),
        }
    }
}
