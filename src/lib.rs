//! Quarry - a single-node relational storage engine
//!
//! Tables live in heap files of fixed-size pages. Every page read or write
//! goes through one shared buffer pool, and queries are trees of pull-based
//! operators that stream tuples without materializing intermediate results.
//!
//! # Architecture
//!
//! - **Tuples** (`tuple`): fixed-width field types, values, `TupleDesc` and `Tuple`
//!
//! - **Storage Layer** (`storage`): on-disk page format and per-table files
//!   - `HeapPage`: occupancy bitmap followed by fixed-width tuple slots
//!   - `HeapFile`: a table's pages at offset `page_no * page_size`
//!   - `HeapFileIterator`: page-by-page scan through the buffer pool
//!
//! - **Buffer Pool** (`buffer`): the only cache of page state
//!   - `BufferPool`: bounded page cache with dirty write-back on eviction
//!   - `LruReplacer`: strict least-recently-used ordering
//!   - `LockManager`: page lock hooks, no-op by default
//!
//! - **Catalog** (`catalog`): in-memory registry of tables
//!
//! - **Execution** (`execution`): `SeqScan`, `Filter`, `Insert`, `Delete`
//!   and `Aggregate` over the `OpIterator` protocol
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry::execution::{collect_tuples, Aggregate, AggregateOp, OpIterator, SeqScan};
//! use quarry::tuple::{DataType, TupleDesc};
//! use quarry::{Config, Database, TransactionId};
//!
//! let db = Database::new(Config::default());
//! let desc = TupleDesc::builder()
//!     .field("id", DataType::Integer)
//!     .field("price", DataType::Integer)
//!     .build_arc()
//!     .unwrap();
//! let table = db.create_table("items", "items.dat", desc, Some("id")).unwrap();
//!
//! let tid = TransactionId::new();
//! let scan = SeqScan::new(db.buffer_pool().clone(), tid, table, "i").unwrap();
//! let mut sum = Aggregate::new(Box::new(scan), 1, None, AggregateOp::Sum).unwrap();
//! sum.open().unwrap();
//! for tuple in collect_tuples(&mut sum).unwrap() {
//!     println!("{}", tuple);
//! }
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod database;
pub mod execution;
pub mod storage;
pub mod tuple;

pub use common::{
    Config, ErrorKind, PageId, Permissions, QuarryError, RecordId, Result, SlotId, TableId,
    TransactionId,
};
pub use database::Database;
