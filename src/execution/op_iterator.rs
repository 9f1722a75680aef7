use std::sync::Arc;

use crate::common::{QuarryError, Result};
use crate::tuple::{Tuple, TupleDesc};

/// Open flag plus a one-tuple lookahead, shared by every operator.
#[derive(Debug, Default)]
pub struct OperatorState {
    open: bool,
    lookahead: Option<Tuple>,
}

impl OperatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Marks the operator open with an empty lookahead.
    pub fn open(&mut self) {
        self.open = true;
        self.lookahead = None;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.lookahead = None;
    }

    /// Drops the lookahead so the next pull starts from the rewound position.
    pub fn reset(&mut self) {
        self.lookahead = None;
    }
}

/// The pull-based contract every relational operator implements.
///
/// Operators move through `closed -> open -> closed`. Implementations produce
/// tuples through [`fetch_next`](OpIterator::fetch_next); the provided
/// [`has_next`](OpIterator::has_next) and [`next`](OpIterator::next) buffer
/// one tuple in the operator's [`OperatorState`], so `has_next` can be called
/// any number of times without consuming anything.
///
/// `open` opens children before doing operator-local setup, and `close`
/// closes them. `rewind` restarts production from the first tuple.
pub trait OpIterator: Send {
    /// Schema of the tuples this operator produces.
    fn tuple_desc(&self) -> &Arc<TupleDesc>;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self);

    fn rewind(&mut self) -> Result<()>;

    /// Produces the next tuple, or None when the operator is exhausted.
    fn fetch_next(&mut self) -> Result<Option<Tuple>>;

    fn state(&mut self) -> &mut OperatorState;

    fn has_next(&mut self) -> Result<bool> {
        if !self.state().is_open() {
            return Err(QuarryError::IteratorNotOpen);
        }
        if self.state().lookahead.is_none() {
            let next = self.fetch_next()?;
            self.state().lookahead = next;
        }
        Ok(self.state().lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(QuarryError::NoSuchElement("operator is exhausted".into()));
        }
        self.state()
            .lookahead
            .take()
            .ok_or_else(|| QuarryError::NoSuchElement("operator is exhausted".into()))
    }
}

/// Drains an open operator into a vector.
pub fn collect_tuples(op: &mut dyn OpIterator) -> Result<Vec<Tuple>> {
    let mut tuples = Vec::new();
    while op.has_next()? {
        tuples.push(op.next()?);
    }
    Ok(tuples)
}
