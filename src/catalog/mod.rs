//! Catalog module
//!
//! This module contains the column and schema definitions shared by storage,
//! caching and execution.

pub mod schema;

pub use schema::{Column, Schema};
