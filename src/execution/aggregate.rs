use std::sync::Arc;

use log::debug;

use crate::common::Result;
use crate::tuple::{Tuple, TupleDesc};

use super::{AggregateOp, Aggregator, OpIterator, OperatorState, TupleIterator};

/// Computes one aggregate over its child, optionally grouped by a field.
///
/// Blocking: `open` drains the whole child into an [`Aggregator`] and the
/// results are then served from memory. Memory grows with the number of
/// distinct groups rather than with the input.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    desc: Arc<TupleDesc>,
    aggregator: Aggregator,
    results: Option<TupleIterator>,
    state: OperatorState,
}

impl Aggregate {
    /// Fails if either field index is out of range for the child's schema or
    /// `op` is not supported on the aggregate field's type.
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let aggregator = Aggregator::new(child.tuple_desc(), group_field, agg_field, op)?;
        let desc = aggregator.tuple_desc().clone();
        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            desc,
            aggregator,
            results: None,
            state: OperatorState::new(),
        })
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    /// Name of the group-by field in the child's schema, if grouping.
    pub fn group_field_name(&self) -> Option<&str> {
        self.group_field
            .and_then(|g| self.child.tuple_desc().field_name(g).ok().flatten())
    }

    pub fn aggregate_field(&self) -> usize {
        self.agg_field
    }

    /// Name of the aggregated field in the child's schema.
    pub fn aggregate_field_name(&self) -> Option<&str> {
        self.child
            .tuple_desc()
            .field_name(self.agg_field)
            .ok()
            .flatten()
    }

    pub fn aggregate_op(&self) -> AggregateOp {
        self.op
    }

    fn compute(&mut self) -> Result<()> {
        self.aggregator.clear();
        let mut rows = 0usize;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.aggregator.merge_tuple_into_group(&tuple)?;
            rows += 1;
        }
        let mut results = self.aggregator.iterator()?;
        results.open()?;
        debug!("{} aggregated {} rows", self.op, rows);
        self.results = Some(results);
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.compute()?;
        self.state.open();
        Ok(())
    }

    fn close(&mut self) {
        self.state.close();
        if let Some(mut results) = self.results.take() {
            results.close();
        }
        self.aggregator.clear();
        self.child.close();
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        if let Some(results) = self.results.as_mut() {
            results.rewind()?;
        }
        self.state.reset();
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        let Some(results) = self.results.as_mut() else {
            return Ok(None);
        };
        if results.has_next()? {
            results.next().map(Some)
        } else {
            Ok(None)
        }
    }

    fn state(&mut self) -> &mut OperatorState {
        &mut self.state
    }
}
