//! Caching layers
//!
//! - Bounded LRU cache with per-entry time-to-live
//! - Coordinator pairing the query-result and table metadata caches
//! - Acceleration layer of materialized tables

pub mod coordinator;
pub mod lru;
pub mod memory;

pub use coordinator::{CacheCoordinator, CacheStats, ColumnSummary, QueryKey, TableSummary};
pub use lru::{BoundedCache, CacheEntry};
pub use memory::{AccelerationLayer, MemoryTable};
