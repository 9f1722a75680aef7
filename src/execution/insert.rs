use std::sync::Arc;

use log::{debug, warn};

use crate::buffer::BufferPool;
use crate::common::{ErrorKind, QuarryError, Result, TableId, TransactionId};
use crate::tuple::{DataType, Tuple, TupleDesc, Value};

use super::{OpIterator, OperatorState};

/// Schema of the single tuple an Insert or Delete returns.
pub(crate) fn count_desc() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::single(DataType::Integer, Some("count")))
}

/// Inserts every tuple its child produces into a table.
///
/// The first pull drains the child and returns one tuple holding the number
/// of rows inserted; later pulls, including after `rewind`, return nothing.
/// A row that fails with a storage error is logged and skipped so the rest
/// of the input still lands. Any other error aborts the insert.
pub struct Insert {
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    table_id: TableId,
    pool: Arc<BufferPool>,
    desc: Arc<TupleDesc>,
    done: bool,
    state: OperatorState,
}

impl Insert {
    /// Fails if the child's schema differs from the table's.
    pub fn new(
        tid: TransactionId,
        child: Box<dyn OpIterator>,
        table_id: TableId,
        pool: Arc<BufferPool>,
    ) -> Result<Self> {
        let table_desc = pool.catalog().tuple_desc(table_id)?;
        if **child.tuple_desc() != *table_desc {
            return Err(QuarryError::schema(format!(
                "cannot insert ({}) into table {} ({})",
                child.tuple_desc(),
                table_id,
                table_desc
            )));
        }
        Ok(Self {
            tid,
            child,
            table_id,
            pool,
            desc: count_desc(),
            done: false,
            state: OperatorState::new(),
        })
    }
}

impl OpIterator for Insert {
    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.state.open();
        Ok(())
    }

    fn close(&mut self) {
        self.state.close();
        self.child.close();
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.state.reset();
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let mut count = 0;
        while self.child.has_next()? {
            let mut tuple = self.child.next()?;
            match self.pool.insert_tuple(self.tid, self.table_id, &mut tuple) {
                Ok(()) => count += 1,
                Err(e) if e.kind() == ErrorKind::Storage => {
                    warn!("skipping row in insert into {}: {}", self.table_id, e);
                }
                Err(e) => return Err(e),
            }
        }
        debug!("inserted {} rows into {}", count, self.table_id);

        Ok(Some(Tuple::new(self.desc.clone(), vec![Value::Integer(count)])?))
    }

    fn state(&mut self) -> &mut OperatorState {
        &mut self.state
    }
}
