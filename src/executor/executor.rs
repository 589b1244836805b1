//! Query Executor for LayerDB
//!
//! [`ExecutionEngine`] is the single entry point: it parses one statement,
//! dispatches it against the storage engine and keeps the caches coherent.
//! Every mutation invalidates the cached results and the materialized copy
//! of its table before the snapshot is rewritten.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{AccelerationLayer, CacheCoordinator, CacheStats, QueryKey, TableSummary};
use crate::catalog::Column;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::Statement;
use crate::storage::{Row, RowId, StorageEngine, Table, Value};

/// One result row; `None` marks a requested column the table does not have
pub type ResultRow = Vec<Option<Value>>;

/// Outcome of one executed statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecOutcome {
    /// SELECT and DESCRIBE
    Rows(Vec<ResultRow>),
    /// Row id of an INSERT, affected rows of a DELETE
    Count(u64),
    /// CREATE TABLE
    Message(String),
}

impl ExecOutcome {
    /// The rows, if this is a row-returning outcome
    pub fn rows(&self) -> Option<&[ResultRow]> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            ExecOutcome::Count(n) => Some(*n),
            _ => None,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    /// Statements passed to `execute`, failed ones included
    pub statements_executed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache: CacheStats,
    /// Table names in creation order
    pub tables: Vec<String>,
}

/// Execution Engine
pub struct ExecutionEngine {
    storage: StorageEngine,
    cache: CacheCoordinator,
    acceleration: AccelerationLayer,
    /// Durable scans returning fewer rows than this materialize the table
    acceleration_threshold: usize,
    statements_executed: u64,
    cache_hits: u64,
    cache_misses: u64,
}

impl ExecutionEngine {
    /// Open the database described by `config`, loading its snapshot
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let storage = StorageEngine::open(config.path.clone(), config.tree_order)?;
        let cache = CacheCoordinator::new(&config);

        info!(
            path = ?config.path,
            tables = storage.table_names().len(),
            "database opened"
        );

        Ok(Self {
            storage,
            cache,
            acceleration: AccelerationLayer::new(),
            acceleration_threshold: config.acceleration_threshold,
            statements_executed: 0,
            cache_hits: 0,
            cache_misses: 0,
        })
    }

    /// Execute one SQL statement.
    ///
    /// Any failure, including a parse error, comes back as
    /// [`Error::ExecutionError`] carrying the original message.
    pub fn execute(&mut self, sql: &str) -> Result<ExecOutcome> {
        self.run(|engine| {
            let statement = crate::sql::parse(sql)?;
            engine.execute_statement(sql, statement)
        })
    }

    /// Count one statement and normalize its failure
    fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.statements_executed += 1;

        op(self).map_err(|e| {
            debug!(error = %e, "statement failed");
            e.into_execution()
        })
    }

    /// `sql` is the text the statement was parsed from and keys the
    /// query-result cache.
    fn execute_statement(&mut self, sql: &str, statement: Statement) -> Result<ExecOutcome> {
        debug!(table = statement.table_name(), "executing statement");

        match statement {
            Statement::CreateTable(stmt) => {
                self.execute_create_table(stmt).map(ExecOutcome::Message)
            }
            Statement::Insert(stmt) => self.execute_insert(stmt).map(ExecOutcome::Count),
            Statement::Select(stmt) => self.execute_select(sql, stmt).map(ExecOutcome::Rows),
            Statement::Delete(stmt) => self.execute_delete(stmt).map(ExecOutcome::Count),
            Statement::Describe(stmt) => {
                self.execute_describe(&stmt.table_name).map(ExecOutcome::Rows)
            }
        }
    }

    // ========== Programmatic API ==========
    //
    // Each call builds the statement directly and runs it through the same
    // counting and error normalization as `execute`. Selects are keyed by
    // the statement's canonical SQL text, so `select("t", None, None)` and
    // `execute("SELECT * FROM t")` share a cache entry.

    /// Create a table from `(name, type)` pairs
    pub fn create_table(&mut self, name: &str, columns: &[(&str, &str)]) -> Result<String> {
        let stmt = CreateTableStatement {
            table_name: name.to_string(),
            columns: columns
                .iter()
                .map(|(column, data_type)| Column::new(*column, data_type.to_uppercase()))
                .collect(),
        };
        self.run(|engine| engine.execute_create_table(stmt))
    }

    /// Insert one row, returning its id
    pub fn insert(&mut self, table: &str, values: Vec<Value>) -> Result<RowId> {
        let stmt = InsertStatement {
            table_name: table.to_string(),
            values,
        };
        self.run(|engine| engine.execute_insert(stmt))
    }

    /// Select `columns` (all when `None`) from `table`
    pub fn select(
        &mut self,
        table: &str,
        columns: Option<&[&str]>,
        predicate: Option<Predicate>,
    ) -> Result<Vec<ResultRow>> {
        let projection = match columns {
            Some(names) => Projection::Columns(names.iter().map(|n| n.to_string()).collect()),
            None => Projection::Wildcard,
        };
        let stmt = SelectStatement {
            projection,
            table_name: table.to_string(),
            predicate,
        };
        let sql = stmt.to_string();
        self.run(|engine| engine.execute_select(&sql, stmt))
    }

    /// Delete matching rows (all when `predicate` is `None`)
    pub fn delete(&mut self, table: &str, predicate: Option<Predicate>) -> Result<u64> {
        let stmt = DeleteStatement {
            table_name: table.to_string(),
            predicate,
        };
        self.run(|engine| engine.execute_delete(stmt))
    }

    // ========== Statement handlers ==========

    fn execute_create_table(&mut self, stmt: CreateTableStatement) -> Result<String> {
        let summary = TableSummary::from_columns(&stmt.columns);
        self.storage.create_table(&stmt.table_name, stmt.columns)?;
        self.cache.cache_table_metadata(&stmt.table_name, summary);

        Ok(format!("Table '{}' created successfully", stmt.table_name))
    }

    fn execute_insert(&mut self, stmt: InsertStatement) -> Result<RowId> {
        let row_id = self.table_mut(&stmt.table_name)?.insert_row(stmt.values)?;

        self.invalidate(&stmt.table_name);
        self.commit_mutation()?;

        Ok(row_id)
    }

    fn execute_delete(&mut self, stmt: DeleteStatement) -> Result<u64> {
        let deleted = self
            .table_mut(&stmt.table_name)?
            .delete_where(stmt.predicate.as_ref())?;

        self.invalidate(&stmt.table_name);
        self.commit_mutation()?;

        Ok(deleted as u64)
    }

    fn execute_select(&mut self, sql: &str, stmt: SelectStatement) -> Result<Vec<ResultRow>> {
        let key = QueryKey::new(&stmt.table_name, sql);

        if let Some(rows) = self.cache.get_query_result(&key) {
            self.cache_hits += 1;
            debug!(table = %stmt.table_name, rows = rows.len(), "served from query cache");
            return Ok(self.project(&stmt, &rows));
        }
        self.cache_misses += 1;

        let table = self
            .storage
            .get_table(&stmt.table_name)
            .ok_or_else(|| Error::TableNotFound(stmt.table_name.clone()))?;

        let rows: Vec<Row> = match self.acceleration.get(&stmt.table_name) {
            Some(memory) => {
                let found = match &stmt.predicate {
                    Some(predicate) => memory.select_where(predicate)?,
                    None => memory.select_all(),
                };
                found.into_iter().cloned().collect()
            }
            None => {
                let found: Vec<Row> = match &stmt.predicate {
                    Some(predicate) => table.select_where(predicate)?,
                    None => table.select_all(),
                }
                .into_iter()
                .cloned()
                .collect();

                if found.len() < self.acceleration_threshold {
                    let snapshot = table.select_all().into_iter().cloned().collect();
                    self.acceleration
                        .load_table_into_memory(&stmt.table_name, snapshot, table.columns());
                }
                found
            }
        };

        let result = self.project(&stmt, &rows);
        self.cache.cache_query_result(&key, rows);
        Ok(result)
    }

    fn execute_describe(&self, table_name: &str) -> Result<Vec<ResultRow>> {
        let table = self.table(table_name)?;
        let rows = table
            .columns()
            .iter()
            .map(|c| {
                vec![
                    Some(Value::Text(c.name.clone())),
                    Some(Value::Text(c.data_type.clone())),
                    Some(Value::Text(c.constraint_string())),
                ]
            })
            .collect();
        Ok(rows)
    }

    /// Apply the select list to raw rows, skipping tombstoned ones
    fn project(&self, stmt: &SelectStatement, rows: &[Row]) -> Vec<ResultRow> {
        let live = rows.iter().filter(|row| row.is_live());

        match &stmt.projection {
            Projection::Wildcard => live
                .map(|row| row.values.iter().cloned().map(Some).collect())
                .collect(),
            Projection::Columns(names) => {
                let table = self.storage.get_table(&stmt.table_name);
                let positions: Vec<Option<usize>> = names
                    .iter()
                    .map(|name| table.and_then(|t| t.get_column_index(name)))
                    .collect();

                live.map(|row| {
                    positions
                        .iter()
                        .map(|pos| pos.and_then(|i| row.get(i)).cloned())
                        .collect()
                })
                .collect()
            }
        }
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.storage
            .get_table(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.storage
            .get_table_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Drop every cached view of `table`
    fn invalidate(&mut self, table: &str) {
        self.cache.invalidate_table(table);
        if self.acceleration.invalidate(table) {
            debug!(table, "dropped materialized table");
        }
    }

    /// Persist after a mutation. The in-memory change is kept even when the
    /// write fails; the next successful commit carries it.
    fn commit_mutation(&mut self) -> Result<()> {
        self.storage.commit().map_err(|e| {
            warn!(error = %e, "commit failed, mutation kept in memory only");
            e
        })
    }

    /// Column names, types and index coverage of `table`, read through the
    /// metadata cache
    pub fn table_summary(&mut self, table: &str) -> Result<TableSummary> {
        if let Some(summary) = self.cache.get_table_metadata(table) {
            return Ok(summary);
        }

        let summary = TableSummary::from_columns(self.table(table)?.columns());
        self.cache.cache_table_metadata(table, summary.clone());
        Ok(summary)
    }

    /// Table names in creation order
    pub fn table_names(&self) -> Vec<String> {
        self.storage.table_names()
    }

    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            statements_executed: self.statements_executed,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            cache: self.cache.stats(),
            tables: self.storage.table_names(),
        }
    }

    /// Sweep expired cache entries, returning how many were dropped
    pub fn cleanup_cache(&mut self) -> usize {
        self.cache.cleanup()
    }

    /// Drop every cached result, summary and materialized table
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        for name in self.storage.table_names() {
            self.acceleration.invalidate(&name);
        }
    }

    /// Whether `table` currently has a materialized copy
    pub fn is_materialized(&self, table: &str) -> bool {
        self.acceleration.contains(table)
    }

    /// Rewrite the snapshot
    pub fn commit(&self) -> Result<()> {
        self.storage.commit()
    }

    /// Commit and sweep the caches
    pub fn close(mut self) -> Result<()> {
        self.storage.commit()?;
        let swept = self.cleanup_cache();
        info!(swept, "database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_engine() -> ExecutionEngine {
        let mut engine = ExecutionEngine::open(DatabaseConfig::new()).unwrap();
        engine
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        engine
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::from(s))
    }

    fn int(n: i64) -> Option<Value> {
        Some(Value::Integer(n))
    }

    fn rows(engine: &mut ExecutionEngine, sql: &str) -> Vec<ResultRow> {
        match engine.execute(sql).unwrap() {
            ExecOutcome::Rows(rows) => rows,
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_create_table() {
        let mut engine = ExecutionEngine::open(DatabaseConfig::new()).unwrap();
        let outcome = engine.execute("CREATE TABLE users (id INTEGER)").unwrap();
        assert_eq!(
            outcome,
            ExecOutcome::Message("Table 'users' created successfully".to_string())
        );
        assert_eq!(engine.stats().cache.metadata_cache_size, 1);

        let err = engine.execute("CREATE TABLE users (id INTEGER)").unwrap_err();
        assert!(matches!(err, Error::ExecutionError(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_insert_and_select() {
        let mut engine = create_test_engine();
        assert_eq!(engine.execute("INSERT INTO t VALUES (1, 'a')").unwrap().count(), Some(1));
        assert_eq!(engine.execute("INSERT INTO t VALUES (2, 'b')").unwrap().count(), Some(2));

        assert_eq!(
            rows(&mut engine, "SELECT * FROM t"),
            vec![vec![int(1), text("a")], vec![int(2), text("b")]]
        );
        assert_eq!(
            rows(&mut engine, "SELECT name, missing, id FROM t WHERE id > 1"),
            vec![vec![text("b"), None, int(2)]]
        );
    }

    #[test]
    fn test_select_is_cached_until_mutation() {
        let mut engine = create_test_engine();
        engine.execute("INSERT INTO t VALUES (1, 'a')").unwrap();

        assert_eq!(rows(&mut engine, "SELECT * FROM t").len(), 1);
        assert_eq!(rows(&mut engine, "SELECT * FROM t").len(), 1);
        let stats = engine.stats();
        assert_eq!((stats.cache_hits, stats.cache_misses), (1, 1));

        engine.execute("INSERT INTO t VALUES (2, 'b')").unwrap();
        assert_eq!(rows(&mut engine, "SELECT * FROM t").len(), 2);
        assert_eq!(engine.stats().cache_misses, 2);
    }

    #[test]
    fn test_small_scan_materializes_and_mutation_drops_it() {
        let mut engine = create_test_engine();
        engine.execute("INSERT INTO t VALUES (1, 'a')").unwrap();
        assert!(!engine.is_materialized("t"));

        rows(&mut engine, "SELECT * FROM t WHERE id = 1");
        assert!(engine.is_materialized("t"));

        // A different text misses the query cache and is served from memory
        assert_eq!(
            rows(&mut engine, "SELECT name FROM t WHERE id = 1"),
            vec![vec![text("a")]]
        );

        engine.execute("DELETE FROM t WHERE id = 1").unwrap();
        assert!(!engine.is_materialized("t"));
        assert!(rows(&mut engine, "SELECT name FROM t WHERE id = 1").is_empty());
    }

    #[test]
    fn test_threshold_zero_never_materializes() {
        let config = DatabaseConfig::new().acceleration_threshold(0);
        let mut engine = ExecutionEngine::open(config).unwrap();
        engine.execute("CREATE TABLE t (id INTEGER)").unwrap();
        engine.execute("INSERT INTO t VALUES (1)").unwrap();
        rows(&mut engine, "SELECT * FROM t");
        assert!(!engine.is_materialized("t"));
    }

    #[test]
    fn test_delete_all() {
        let mut engine = create_test_engine();
        for i in 0..4 {
            engine
                .execute(&format!("INSERT INTO t VALUES ({}, 'x')", i))
                .unwrap();
        }
        assert_eq!(engine.execute("DELETE FROM t").unwrap(), ExecOutcome::Count(4));
        assert!(rows(&mut engine, "SELECT * FROM t").is_empty());
        assert_eq!(
            engine.execute("INSERT INTO t VALUES (9, 'y')").unwrap(),
            ExecOutcome::Count(5)
        );
    }

    #[test]
    fn test_describe() {
        let mut engine = create_test_engine();
        assert_eq!(
            rows(&mut engine, "DESC t"),
            vec![
                vec![text("id"), text("INTEGER"), text("PRIMARY KEY")],
                vec![text("name"), text("TEXT"), text("")],
            ]
        );
    }

    #[test]
    fn test_errors_are_execution_errors() {
        let mut engine = create_test_engine();

        for sql in [
            "SELECT * FROM nope",
            "INSERT INTO nope VALUES (1)",
            "DELETE FROM nope",
            "DESCRIBE nope",
        ] {
            let err = engine.execute(sql).unwrap_err();
            assert!(matches!(err, Error::ExecutionError(_)), "{}", sql);
            assert!(err.to_string().contains("table 'nope' does not exist"), "{}", sql);
        }

        let err = engine.execute("SELEC * FROM t").unwrap_err();
        assert!(err.to_string().contains("Parse error"));

        let err = engine.execute("INSERT INTO t VALUES (1)").unwrap_err();
        assert!(err.to_string().contains("expected 2 values, got 1"));

        engine.execute("INSERT INTO t VALUES (1, 'a')").unwrap();
        let err = engine.execute("SELECT * FROM t WHERE name > 3").unwrap_err();
        assert!(err.to_string().contains("cannot compare"));

        assert_eq!(engine.stats().statements_executed, 9);
    }

    #[test]
    fn test_table_summary_reads_through() {
        let mut engine = create_test_engine();
        engine.clear_cache();
        assert_eq!(engine.stats().cache.metadata_cache_size, 0);

        let summary = engine.table_summary("t").unwrap();
        assert_eq!(summary.indexed_columns, vec!["id", "name"]);
        assert_eq!(engine.stats().cache.metadata_cache_size, 1);

        assert!(matches!(
            engine.table_summary("nope"),
            Err(Error::TableNotFound(_))
        ));
    }
}
