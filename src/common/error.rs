use thiserror::Error;

use super::types::{PageId, TableId, TransactionId};

/// Broad classification of a [`QuarryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Schema,
    Index,
    NoSuchElement,
    BufferPoolFull,
    TransactionAborted,
}

/// Database error types
#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{page_id} is beyond the end of the file ({num_pages} pages)")]
    PageOutOfBounds { page_id: PageId, num_pages: u32 },

    #[error("{page_id} does not belong to table {table_id}")]
    ForeignPage { page_id: PageId, table_id: TableId },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table '{0}' not found")]
    TableNameNotFound(String),

    #[error("Iterator is not open")]
    IteratorNotOpen,

    #[error("Buffer pool is full, no evictable pages available")]
    BufferPoolFull,

    #[error("Page {0} is full")]
    PageFull(PageId),

    #[error("Slot {slot} of {page_id} is empty")]
    EmptySlot { page_id: PageId, slot: u16 },

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Record {record_page} is not stored on {page_id}")]
    RecordNotOnPage { record_page: PageId, page_id: PageId },

    #[error("Transaction {0} aborted")]
    TransactionAborted(TransactionId),
}

impl QuarryError {
    /// Returns the kind this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuarryError::Io(_)
            | QuarryError::PageOutOfBounds { .. }
            | QuarryError::ForeignPage { .. }
            | QuarryError::PageFull(_)
            | QuarryError::EmptySlot { .. }
            | QuarryError::MissingRecordId
            | QuarryError::RecordNotOnPage { .. } => ErrorKind::Storage,
            QuarryError::Schema(_) => ErrorKind::Schema,
            QuarryError::IndexOutOfRange { .. } | QuarryError::InvalidSlotId(_) => {
                ErrorKind::Index
            }
            QuarryError::NoSuchElement(_)
            | QuarryError::TableNotFound(_)
            | QuarryError::TableNameNotFound(_)
            | QuarryError::IteratorNotOpen => ErrorKind::NoSuchElement,
            QuarryError::BufferPoolFull => ErrorKind::BufferPoolFull,
            QuarryError::TransactionAborted(_) => ErrorKind::TransactionAborted,
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        QuarryError::Schema(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, QuarryError>;
