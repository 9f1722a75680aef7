use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{Config, Result, TableId};
use crate::tuple::TupleDesc;

/// Owns the catalog and the buffer pool shared by every operator.
///
/// Cloning the inner `Arc`s is how operators and threads get at them; the
/// handle itself holds no other state.
pub struct Database {
    config: Config,
    catalog: Arc<Catalog>,
    pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(Catalog::new(config.page_size));
        let pool = Arc::new(BufferPool::new(config.buffer_pool_pages, catalog.clone()));
        Self {
            config,
            catalog,
            pool,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Shorthand for [`Catalog::create_table`].
    pub fn create_table<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        desc: Arc<TupleDesc>,
        primary_key: Option<&str>,
    ) -> Result<TableId> {
        self.catalog.create_table(name, path, desc, primary_key)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
