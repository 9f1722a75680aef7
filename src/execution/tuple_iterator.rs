use std::sync::Arc;

use crate::common::{QuarryError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::{OpIterator, OperatorState};

/// Operator over an in-memory list of tuples.
#[derive(Debug)]
pub struct TupleIterator {
    desc: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    pos: usize,
    state: OperatorState,
}

impl TupleIterator {
    /// Every tuple must have a descriptor equal to `desc`.
    pub fn new(desc: Arc<TupleDesc>, tuples: Vec<Tuple>) -> Result<Self> {
        if let Some(bad) = tuples.iter().find(|t| **t.tuple_desc() != *desc) {
            return Err(QuarryError::schema(format!(
                "tuple ({}) does not match ({})",
                bad.tuple_desc(),
                desc
            )));
        }
        Ok(Self {
            desc,
            tuples,
            pos: 0,
            state: OperatorState::new(),
        })
    }
}

impl OpIterator for TupleIterator {
    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        self.pos = 0;
        self.state.open();
        Ok(())
    }

    fn close(&mut self) {
        self.state.close();
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        self.state.reset();
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        let tuple = self.tuples.get(self.pos).cloned();
        if tuple.is_some() {
            self.pos += 1;
        }
        Ok(tuple)
    }

    fn state(&mut self) -> &mut OperatorState {
        &mut self.state
    }
}
