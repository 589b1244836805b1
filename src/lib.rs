//! LayerDB - A small layered relational database engine written in Rust
//!
//! This library provides:
//! - SQL parsing (lexer, parser, AST) for CREATE TABLE, INSERT, SELECT,
//!   DELETE and DESCRIBE
//! - Storage engine (B+ trees, tables with secondary indexes, snapshots)
//! - Caching (LRU query-result and metadata caches, materialized tables)
//! - Query execution

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use config::DatabaseConfig;
pub use error::{Error, ErrorKind, Result};
pub use executor::{DatabaseStats, ExecOutcome, ExecutionEngine, ResultRow};
pub use sql::ast::{CompareOp, Predicate};
pub use storage::Value;
