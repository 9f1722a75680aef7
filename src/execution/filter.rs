use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Tuple, TupleDesc};

use super::{OpIterator, OperatorState, Predicate};

/// Passes through the child tuples that satisfy a predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    state: OperatorState,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            state: OperatorState::new(),
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl OpIterator for Filter {
    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        self.child.tuple_desc()
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
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.filter(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn state(&mut self) -> &mut OperatorState {
        &mut self.state
    }
}
