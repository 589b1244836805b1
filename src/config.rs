//! Database configuration
//!
//! All knobs of the engine with their defaults. Built with chained setters:
//!
//! ```
//! use layerdb::DatabaseConfig;
//!
//! let config = DatabaseConfig::new().path("data/app.db").cache_capacity(200);
//! assert_eq!(config.metadata_cache_capacity(), 20);
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Default number of entries in the query-result cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default time-to-live of a cached query result
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(300);

/// Default time-to-live of a cached table summary
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(3600);

/// Scans returning fewer rows than this materialize the table in memory
pub const DEFAULT_ACCELERATION_THRESHOLD: usize = 1000;

/// Environment variable holding the snapshot path
pub const ENV_PATH: &str = "LAYERDB_PATH";

/// Environment variable holding the query cache capacity
pub const ENV_CACHE_SIZE: &str = "LAYERDB_CACHE_SIZE";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Snapshot file; `None` keeps everything in memory
    pub path: Option<PathBuf>,
    /// Query-result cache capacity; the metadata cache gets a tenth of it
    pub cache_capacity: usize,
    /// Time-to-live of cached query results
    pub query_ttl: Duration,
    /// Time-to-live of cached table summaries
    pub metadata_ttl: Duration,
    /// Result size under which a durable scan materializes the table
    pub acceleration_threshold: usize,
    /// Order of every search tree created by this database
    pub tree_order: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            query_ttl: DEFAULT_QUERY_TTL,
            metadata_ttl: DEFAULT_METADATA_TTL,
            acceleration_threshold: DEFAULT_ACCELERATION_THRESHOLD,
            tree_order: crate::storage::btree::DEFAULT_ORDER,
        }
    }
}

impl DatabaseConfig {
    /// Create a new config with default values and no snapshot file
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with defaults, overridden by `LAYERDB_PATH` and
    /// `LAYERDB_CACHE_SIZE` when set. Unparseable sizes are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(ENV_PATH) {
            if !path.is_empty() {
                config = config.path(path);
            }
        }
        if let Some(size) = std::env::var(ENV_CACHE_SIZE)
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config = config.cache_capacity(size);
        }
        config
    }

    /// Set the snapshot path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the query cache capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the query result time-to-live
    pub fn query_ttl(mut self, ttl: Duration) -> Self {
        self.query_ttl = ttl;
        self
    }

    /// Set the table summary time-to-live
    pub fn metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = ttl;
        self
    }

    /// Set the materialization threshold
    pub fn acceleration_threshold(mut self, rows: usize) -> Self {
        self.acceleration_threshold = rows;
        self
    }

    /// Set the search tree order
    pub fn tree_order(mut self, order: usize) -> Self {
        self.tree_order = order;
        self
    }

    /// Capacity of the table metadata cache
    pub fn metadata_cache_capacity(&self) -> usize {
        (self.cache_capacity / 10).max(1)
    }
}
