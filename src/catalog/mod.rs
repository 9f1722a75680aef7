//! In-memory registry of tables.
//!
//! Maps a table id to its heap file, name and primary key. Nothing here is
//! persisted; a catalog is rebuilt by registering the same files again.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::common::{QuarryError, Result, TableId};
use crate::storage::disk::HeapFile;
use crate::tuple::TupleDesc;

struct Table {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TableId, Table>,
    by_name: HashMap<String, TableId>,
}

pub struct Catalog {
    page_size: usize,
    next_id: AtomicU32,
    tables: RwLock<Tables>,
}

impl Catalog {
    /// Creates an empty catalog whose tables use `page_size`-byte pages.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            next_id: AtomicU32::new(1),
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reserves a table id that no registered table uses.
    pub fn next_table_id(&self) -> TableId {
        TableId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers `file` under `name`. A table already registered under the
    /// same name, or with the same id, is replaced.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: Option<&str>) {
        let id = file.id();
        self.next_id.fetch_max(id.as_u32() + 1, Ordering::Relaxed);

        let mut tables = self.tables.write();
        if let Some(old_id) = tables.by_name.remove(name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&id) {
            tables.by_name.remove(&old.name);
        }
        tables.by_name.insert(name.to_string(), id);
        tables.by_id.insert(
            id,
            Table {
                file,
                name: name.to_string(),
                primary_key: primary_key.map(str::to_string),
            },
        );
        debug!("registered table '{}' as {}", name, id);
    }

    /// Opens the heap file at `path` under a fresh id and registers it.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        desc: Arc<TupleDesc>,
        primary_key: Option<&str>,
    ) -> Result<TableId> {
        let id = self.next_table_id();
        let file = HeapFile::open(id, path, desc, self.page_size)?;
        self.add_table(Arc::new(file), name, primary_key);
        Ok(id)
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| QuarryError::TableNameNotFound(name.to_string()))
    }

    pub fn tuple_desc(&self, id: TableId) -> Result<Arc<TupleDesc>> {
        self.with_table(id, |t| t.file.tuple_desc().clone())
    }

    pub fn database_file(&self, id: TableId) -> Result<Arc<HeapFile>> {
        self.with_table(id, |t| t.file.clone())
    }

    pub fn table_name(&self, id: TableId) -> Result<String> {
        self.with_table(id, |t| t.name.clone())
    }

    pub fn primary_key(&self, id: TableId) -> Result<Option<String>> {
        self.with_table(id, |t| t.primary_key.clone())
    }

    /// Ids of all registered tables, in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Forgets every table. Files on disk are untouched.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }

    fn with_table<T>(&self, id: TableId, f: impl FnOnce(&Table) -> T) -> Result<T> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .map(f)
            .ok_or(QuarryError::TableNotFound(id))
    }
}
