//! Table storage for LayerDB
//!
//! A table owns one search tree holding its rows (row id -> row) and one
//! secondary search tree per column (column value -> row id). Deletion only
//! sets the tombstone flag on the stored row; secondary index entries of
//! deleted rows stay in place, so every read path re-checks the flag.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::btree::{SearchTree, DEFAULT_ORDER};
use super::tuple::{Row, RowId, Value};
use crate::catalog::{Column, Schema};
use crate::error::{Error, Result};
use crate::sql::ast::{CompareOp, Predicate};

/// A table combining schema, row store and secondary indexes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    name: String,
    /// Column definitions
    schema: Schema,
    /// Primary store keyed by row id
    rows: SearchTree<RowId, Row>,
    /// One secondary index per column, in column order
    indexes: Vec<SearchTree<Value, RowId>>,
    /// Id handed to the next inserted row
    next_row_id: RowId,
}

impl Table {
    /// Create a new empty table with the default tree order
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self::with_order(name, columns, DEFAULT_ORDER)
    }

    /// Create a new empty table whose trees use the given order
    pub fn with_order(name: impl Into<String>, columns: Vec<Column>, order: usize) -> Self {
        let indexes = columns.iter().map(|_| SearchTree::with_order(order)).collect();
        Self {
            name: name.into(),
            schema: Schema::from_columns(columns),
            rows: SearchTree::with_order(order),
            indexes,
            next_row_id: 1,
        }
    }

    /// Get columns in declaration order
    pub fn columns(&self) -> &[Column] {
        self.schema.columns()
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.schema.get_column_index(name)
    }

    /// Id the next insert will receive
    pub fn next_row_id(&self) -> RowId {
        self.next_row_id
    }

    /// Number of rows that are not tombstoned
    pub fn live_row_count(&self) -> usize {
        self.rows.scan_all().iter().filter(|(_, r)| r.is_live()).count()
    }

    /// Number of entries in a column's secondary index, stale ones included
    pub fn index_len(&self, column: &str) -> Option<usize> {
        let idx = self.get_column_index(column)?;
        Some(self.indexes[idx].len())
    }

    /// Insert a row, returning its new row id
    pub fn insert_row(&mut self, values: Vec<Value>) -> Result<RowId> {
        if values.len() != self.schema.column_count() {
            return Err(Error::ArityMismatch {
                expected: self.schema.column_count(),
                found: values.len(),
            });
        }

        let row_id = self.next_row_id;
        self.next_row_id += 1;

        for (index, value) in self.indexes.iter_mut().zip(&values) {
            index.insert(value.clone(), row_id);
        }
        self.rows.insert(row_id, Row::new(row_id, values));

        Ok(row_id)
    }

    /// Look up a row by id, tombstoned or not
    pub fn get_row(&self, row_id: RowId) -> Option<&Row> {
        self.rows.search(&row_id)
    }

    /// All live rows in row id order
    pub fn select_all(&self) -> Vec<&Row> {
        self.rows
            .scan_all()
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| row.is_live())
            .collect()
    }

    /// Live rows matching `predicate`.
    ///
    /// Equality on a known column goes through that column's secondary
    /// index and returns every live row holding the value; anything else is
    /// a full scan.
    pub fn select_where(&self, predicate: &Predicate) -> Result<Vec<&Row>> {
        if predicate.op == CompareOp::Eq {
            if let Some(idx) = self.get_column_index(&predicate.column) {
                let value = &predicate.value;
                let rows = self.indexes[idx]
                    .range_query(Some(value), Some(value))
                    .into_iter()
                    .filter_map(|(_, row_id)| self.rows.search(row_id))
                    .filter(|row| row.is_live())
                    .collect();
                return Ok(rows);
            }
        }

        self.scan(predicate)
    }

    /// Full ascending scan evaluating `predicate` against every live row
    fn scan(&self, predicate: &Predicate) -> Result<Vec<&Row>> {
        let Some(idx) = self.get_column_index(&predicate.column) else {
            return Ok(Vec::new());
        };

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

    /// Tombstone every live row matching `predicate` (all live rows when
    /// `None`), returning how many were marked.
    ///
    /// Always a full scan; secondary indexes are left untouched.
    pub fn delete_where(&mut self, predicate: Option<&Predicate>) -> Result<usize> {
        let count = match predicate {
            Some(p) => {
                let doomed: Vec<RowId> = self.scan(p)?.into_iter().map(|row| row.id).collect();
                for row_id in &doomed {
                    if let Some(row) = self.rows.search_mut(row_id) {
                        row.deleted = true;
                    }
                }
                doomed.len()
            }
            None => {
                let mut count = 0;
                self.rows.for_each_mut(|_, row| {
                    if row.is_live() {
                        row.deleted = true;
                        count += 1;
                    }
                });
                count
            }
        };

        debug!(table = %self.name, count, "tombstoned rows");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", "INTEGER").constraint("PRIMARY").constraint("KEY"),
                Column::new("name", "TEXT"),
                Column::new("age", "INTEGER"),
            ],
        )
    }

    fn row(id: i64, name: &str, age: i64) -> Vec<Value> {
        vec![Value::Integer(id), Value::from(name), Value::Integer(age)]
    }

    fn ids(rows: &[&Row]) -> Vec<RowId> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_table_insert() {
        let mut table = create_test_table();

        let first = table.insert_row(row(1, "Alice", 25)).unwrap();
        let second = table.insert_row(row(2, "Bob", 30)).unwrap();
        assert_eq!((first, second), (1, 2));
        assert_eq!(table.live_row_count(), 2);
        assert_eq!(table.get_row(first).unwrap().values, row(1, "Alice", 25));
    }

    #[test]
    fn test_table_wrong_column_count() {
        let mut table = create_test_table();

        let result = table.insert_row(vec![Value::Integer(1), Value::from("Alice")]);
        assert!(matches!(
            result,
            Err(Error::ArityMismatch {
                expected: 3,
                found: 2
            })
        ));
        assert_eq!(table.next_row_id(), 1);
    }

    #[test]
    fn test_table_select_where_operators() {
        let mut table = create_test_table();
        for i in 0..10 {
            table.insert_row(row(i, &format!("User{}", i), 20 + i)).unwrap();
        }

        let p = Predicate::new("age", CompareOp::Gte, 27);
        assert_eq!(ids(&table.select_where(&p).unwrap()), vec![8, 9, 10]);

        let p = Predicate::new("age", CompareOp::Lt, 22);
        assert_eq!(ids(&table.select_where(&p).unwrap()), vec![1, 2]);

        let p = Predicate::new("name", CompareOp::Eq, "User4");
        assert_eq!(ids(&table.select_where(&p).unwrap()), vec![5]);

        let p = Predicate::new("id", CompareOp::Neq, 0);
        assert_eq!(table.select_where(&p).unwrap().len(), 9);

        let p = Predicate::new("missing", CompareOp::Gt, 0);
        assert!(table.select_where(&p).unwrap().is_empty());
    }

    #[test]
    fn test_table_index_returns_all_matches() {
        let mut table = create_test_table();
        for i in 0..12 {
            table.insert_row(row(i, "dup", i % 3)).unwrap();
        }

        let p = Predicate::new("age", CompareOp::Eq, 1);
        assert_eq!(ids(&table.select_where(&p).unwrap()), vec![2, 5, 8, 11]);
    }

    #[test]
    fn test_table_delete_keeps_stale_index_entries() {
        let mut table = create_test_table();
        table.insert_row(row(1, "a", 10)).unwrap();
        table.insert_row(row(2, "b", 20)).unwrap();

        let deleted = table
            .delete_where(Some(&Predicate::new("id", CompareOp::Eq, 1)))
            .unwrap();
        assert_eq!(deleted, 1);

        // The index still points at the tombstoned row ...
        assert_eq!(table.index_len("id"), Some(2));
        assert!(table.get_row(1).unwrap().deleted);

        // ... but the indexed lookup filters it out, same as a scan
        let p = Predicate::new("id", CompareOp::Eq, 1);
        assert!(table.select_where(&p).unwrap().is_empty());
        let p = Predicate::new("id", CompareOp::Lte, 1);
        assert!(table.select_where(&p).unwrap().is_empty());

        // Deleting again finds nothing live
        let again = table
            .delete_where(Some(&Predicate::new("id", CompareOp::Eq, 1)))
            .unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn test_table_delete_all_and_ids_not_reused() {
        let mut table = create_test_table();
        for i in 0..5 {
            table.insert_row(row(i, "x", i)).unwrap();
        }

        assert_eq!(table.delete_where(None).unwrap(), 5);
        assert!(table.select_all().is_empty());
        assert_eq!(table.delete_where(None).unwrap(), 0);

        let next = table.insert_row(row(9, "y", 9)).unwrap();
        assert_eq!(next, 6);
        assert_eq!(ids(&table.select_all()), vec![6]);
    }

    #[test]
    fn test_table_type_mismatch_is_error() {
        let mut table = create_test_table();
        table.insert_row(row(1, "a", 10)).unwrap();

        let p = Predicate::new("name", CompareOp::Gt, 5);
        assert!(matches!(
            table.select_where(&p),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(table.delete_where(Some(&p)).is_err());
        assert_eq!(table.live_row_count(), 1);
    }
}
