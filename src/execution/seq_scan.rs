use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TableId, TransactionId};
use crate::storage::disk::HeapFileIterator;
use crate::tuple::{Tuple, TupleDesc};

use super::{OpIterator, OperatorState};

/// Sequential scan over every live tuple of a table.
///
/// Produced tuples carry the table's schema with field names qualified by the
/// scan's alias (`alias.field`), and keep their record ids so they can feed
/// a `Delete`.
pub struct SeqScan {
    table_id: TableId,
    table_name: String,
    alias: String,
    desc: Arc<TupleDesc>,
    iter: HeapFileIterator,
    state: OperatorState,
}

impl SeqScan {
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        alias: &str,
    ) -> Result<Self> {
        let catalog = pool.catalog().clone();
        let file = catalog.database_file(table_id)?;
        let table_name = catalog.table_name(table_id)?;
        let desc = Arc::new(file.tuple_desc().with_prefix(alias));
        let iter = file.iterator(pool, tid);

        Ok(Self {
            table_id,
            table_name,
            alias: alias.to_string(),
            desc,
            iter,
            state: OperatorState::new(),
        })
    }

    /// Scans a table using its own name as the alias.
    pub fn with_table_name(pool: Arc<BufferPool>, tid: TransactionId, table_id: TableId) -> Result<Self> {
        let name = pool.catalog().table_name(table_id)?;
        Self::new(pool, tid, table_id, &name)
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl OpIterator for SeqScan {
    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        self.iter.open()?;
        self.state.open();
        Ok(())
    }

    fn close(&mut self) {
        self.iter.close();
        self.state.close();
    }

    fn rewind(&mut self) -> Result<()> {
        self.iter.rewind()?;
        self.state.reset();
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.iter.has_next()? {
            return Ok(None);
        }
        let mut tuple = self.iter.next()?;
        tuple.reset_tuple_desc(self.desc.clone())?;
        Ok(Some(tuple))
    }

    fn state(&mut self) -> &mut OperatorState {
        &mut self.state
    }
}
