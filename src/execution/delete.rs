use std::sync::Arc;

use log::{debug, warn};

use crate::buffer::BufferPool;
use crate::common::{ErrorKind, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc, Value};

use super::insert::count_desc;
use super::{OpIterator, OperatorState};

/// Deletes every tuple its child produces from the table it was read from.
///
/// Child tuples must carry record ids, as tuples from a `SeqScan` do. Like
/// `Insert`, this is single-shot: the first pull returns the number of rows
/// deleted and later pulls return nothing. Rows failing with a storage error
/// are logged and skipped.
pub struct Delete {
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    pool: Arc<BufferPool>,
    desc: Arc<TupleDesc>,
    done: bool,
    state: OperatorState,
}

impl Delete {
    pub fn new(tid: TransactionId, child: Box<dyn OpIterator>, pool: Arc<BufferPool>) -> Self {
        Self {
            tid,
            child,
            pool,
            desc: count_desc(),
            done: false,
            state: OperatorState::new(),
        }
    }
}

impl OpIterator for Delete {
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
            let tuple = self.child.next()?;
            match self.pool.delete_tuple(self.tid, &tuple) {
                Ok(()) => count += 1,
                Err(e) if e.kind() == ErrorKind::Storage => {
                    warn!("skipping row in delete: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        debug!("deleted {} rows", count);

        Ok(Some(Tuple::new(self.desc.clone(), vec![Value::Integer(count)])?))
    }

    fn state(&mut self) -> &mut OperatorState {
        &mut self.state
    }
}
