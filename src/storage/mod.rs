//! Storage engine module
//!
//! This module contains the durable storage components:
//! - Search tree (B+ tree with chained leaves)
//! - Values and rows
//! - Tables with per-column secondary indexes
//! - Snapshot codec and the storage engine owning all tables

pub mod btree;
pub mod engine;
pub mod snapshot;
pub mod table;
pub mod tuple;

pub use btree::SearchTree;
pub use engine::StorageEngine;
pub use table::Table;
pub use tuple::{Row, RowId, Value};
