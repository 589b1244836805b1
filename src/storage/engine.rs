//! Storage engine for LayerDB
//!
//! Owns every table and persists the whole set as a single snapshot file.
//! There is no write-ahead log: [`StorageEngine::commit`] rewrites the
//! snapshot from scratch, and a crash in the middle of that write can leave
//! a torn file behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::snapshot::{self, TableMap};
use super::table::Table;
use crate::catalog::Column;
use crate::error::{Error, Result};

/// Table set plus its snapshot location
#[derive(Debug)]
pub struct StorageEngine {
    /// Snapshot file; `None` means nothing is persisted
    path: Option<PathBuf>,
    /// Tables by name, in creation order
    tables: TableMap,
    /// Order given to the trees of newly created tables
    tree_order: usize,
}

impl StorageEngine {
    /// Open the engine, loading the snapshot at `path` if it exists and is
    /// non-empty.
    pub fn open(path: Option<PathBuf>, tree_order: usize) -> Result<Self> {
        let tables = match &path {
            Some(p) => Self::load(p)?,
            None => TableMap::new(),
        };

        Ok(Self {
            path,
            tables,
            tree_order,
        })
    }

    /// Engine that never touches the file system
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: TableMap::new(),
            tree_order: super::btree::DEFAULT_ORDER,
        }
    }

    fn load(path: &Path) -> Result<TableMap> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TableMap::new()),
            Err(e) => {
                return Err(Error::Snapshot(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if bytes.is_empty() {
            return Ok(TableMap::new());
        }

        let tables = snapshot::decode(&bytes)?;
        info!(path = %path.display(), tables = tables.len(), "loaded snapshot");
        Ok(tables)
    }

    /// Create a new table and persist
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<()> {
        if self.table_exists(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }

        let table = Table::with_order(name, columns, self.tree_order);
        self.tables.insert(name.to_string(), table);
        info!(table = name, "created table");

        self.commit()
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Get a table by name for mutation
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in creation order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Serialize every table and overwrite the snapshot.
    ///
    /// The file is only opened once the snapshot has been fully encoded.
    pub fn commit(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let blob = snapshot::encode(&self.tables)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, &blob)?;

        debug!(path = %path.display(), bytes = blob.len(), "committed snapshot");
        Ok(())
    }
}
