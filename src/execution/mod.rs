//! Pull-based relational operators.
//!
//! Every operator implements [`OpIterator`] and is composed into a tree
//! whose leaves are [`SeqScan`]s or [`TupleIterator`]s. Pages are reached
//! only through the buffer pool.

mod aggregate;
mod aggregator;
mod delete;
mod filter;
mod insert;
mod op_iterator;
mod predicate;
mod seq_scan;
mod tuple_iterator;

pub use aggregate::Aggregate;
pub use aggregator::{AggregateOp, Aggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use op_iterator::{collect_tuples, OpIterator, OperatorState};
pub use predicate::{Op, Predicate};
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;
