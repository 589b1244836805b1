//! Schema definitions for LayerDB
//!
//! This module defines table schemas and column metadata. Declared types and
//! constraints are recorded as written; they are reported by DESCRIBE but not
//! enforced on insert.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type tag, upper-cased (e.g. `INTEGER`, `VARCHAR(100)`)
    pub data_type: String,
    /// Constraint tokens in declaration order (e.g. `["PRIMARY", "KEY"]`)
    pub constraints: Vec<String>,
}

impl Column {
    /// Create a new column without constraints
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            constraints: Vec::new(),
        }
    }

    /// Append a constraint token
    pub fn constraint(mut self, token: impl Into<String>) -> Self {
        self.constraints.push(token.into());
        self
    }

    /// Constraint tokens joined by single spaces
    pub fn constraint_string(&self) -> String {
        self.constraints.join(" ")
    }
}

/// Table schema - defines the structure of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,
    /// Column name to index mapping
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Create a schema from a list of columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self::new();
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Add a column to the schema.
    ///
    /// A repeated name keeps its first position for lookups.
    pub fn add_column(&mut self, column: Column) {
        self.name_to_index
            .entry(column.name.clone())
            .or_insert(self.columns.len());
        self.columns.push(column);
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
