//! Query execution module
//!
//! This module contains the execution engine that ties the parser, the
//! storage engine and the caching layers together.

pub mod executor;

pub use executor::{DatabaseStats, ExecOutcome, ExecutionEngine, ResultRow};
