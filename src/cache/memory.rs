//! In-memory acceleration layer
//!
//! Holds fully materialized copies of tables with a hash index per column.
//! A copy is only ever valid for the table state it was loaded from; any
//! mutation of the table must drop it via [`AccelerationLayer::invalidate`].

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::Column;
use crate::error::Result;
use crate::sql::ast::{CompareOp, Predicate};
use crate::storage::{Row, Value};

/// Materialized copy of one table
#[derive(Debug, Clone)]
pub struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    /// Per column: value -> positions in `rows`
    indexes: Vec<HashMap<Value, Vec<usize>>>,
}

impl MemoryTable {
    /// Build the copy and its hash indexes over the live rows
    pub fn new(rows: Vec<Row>, columns: &[Column]) -> Self {
        let rows: Vec<Row> = rows.into_iter().filter(Row::is_live).collect();
        let mut indexes = vec![HashMap::<Value, Vec<usize>>::new(); columns.len()];

        for (pos, row) in rows.iter().enumerate() {
            for (index, value) in indexes.iter_mut().zip(&row.values) {
                index.entry(value.clone()).or_default().push(pos);
            }
        }

        Self {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            rows,
            indexes,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Every live row in load order
    pub fn select_all(&self) -> Vec<&Row> {
        self.rows.iter().filter(|r| r.is_live()).collect()
    }

    /// Live rows matching `predicate`.
    ///
    /// Equality is answered from the column's hash index with every
    /// matching row; other operators scan.
    pub fn select_where(&self, predicate: &Predicate) -> Result<Vec<&Row>> {
        let Some(idx) = self.column_index(&predicate.column) else {
            return Ok(Vec::new());
        };

        if predicate.op == CompareOp::Eq {
            let rows = self.indexes[idx]
                .get(&predicate.value)
                .map(|positions| {
                    positions
                        .iter()
                        .filter_map(|&pos| self.rows.get(pos))
                        .filter(|r| r.is_live())
                        .collect()
                })
                .unwrap_or_default();
            return Ok(rows);
        }

        let mut result = Vec::new();
        for row in self.select_all() {
            let Some(value) = row.get(idx) else {
                continue;
            };
            if predicate.op.evaluate(value, &predicate.value)? {
                result.push(row);
            }
        }
        Ok(result)
    }
}

/// Materialized tables by name
#[derive(Debug, Default)]
pub struct AccelerationLayer {
    tables: HashMap<String, MemoryTable>,
}

impl AccelerationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any copy of `name` with a fresh one built from `rows`
    pub fn load_table_into_memory(&mut self, name: &str, rows: Vec<Row>, columns: &[Column]) {
        let table = MemoryTable::new(rows, columns);
        debug!(table = name, rows = table.len(), "materialized table");
        self.tables.insert(name.to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Drop the copy of `name`, returning whether there was one
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.tables.remove(name).is_some()
    }

    /// Number of materialized tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
