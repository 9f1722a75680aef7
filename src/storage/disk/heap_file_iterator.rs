use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Permissions, QuarryError, Result, TransactionId};
use crate::tuple::Tuple;

use super::HeapFile;

struct ScanState {
    /// Page count captured at open; pages appended later are not visited
    num_pages: u32,
    next_page: u32,
    /// Live tuples of the current page not yet returned
    pending: VecDeque<Tuple>,
}

/// Restartable cursor over every live tuple of a heap file, page by page.
///
/// Pages are fetched through the buffer pool, so a scan sees cached
/// modifications that have not been flushed yet. Closing the iterator does
/// not evict anything.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    state: Option<ScanState>,
}

impl HeapFileIterator {
    pub fn new(file: Arc<HeapFile>, pool: Arc<BufferPool>, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            state: None,
        }
    }

    /// Positions at the first page holding a live tuple.
    pub fn open(&mut self) -> Result<()> {
        self.state = Some(ScanState {
            num_pages: self.file.num_pages()?,
            next_page: 0,
            pending: VecDeque::new(),
        });
        self.fill()?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Returns true if another tuple is available. Calling it repeatedly
    /// without `next` does not move the cursor. A closed iterator has nothing
    /// to return.
    pub fn has_next(&mut self) -> Result<bool> {
        self.fill()
    }

    /// Returns the next live tuple.
    pub fn next(&mut self) -> Result<Tuple> {
        if self.state.is_none() {
            return Err(QuarryError::IteratorNotOpen);
        }
        if !self.fill()? {
            return Err(QuarryError::NoSuchElement(format!(
                "scan of table {} is exhausted",
                self.file.id()
            )));
        }
        self.state
            .as_mut()
            .and_then(|s| s.pending.pop_front())
            .ok_or_else(|| QuarryError::NoSuchElement("scan is exhausted".into()))
    }

    /// Restarts the scan from the first live tuple.
    pub fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.state = None;
    }

    /// Loads pages until one with unread tuples is found or the file ends.
    /// Returns whether a tuple is pending.
    fn fill(&mut self) -> Result<bool> {
        let Some(state) = self.state.as_mut() else {
            return Ok(false);
        };

        while state.pending.is_empty() && state.next_page < state.num_pages {
            let pid = PageId::new(self.file.id(), state.next_page);
            let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
            state.pending.extend(page.read().iter().cloned());
            state.next_page += 1;
        }
        Ok(!state.pending.is_empty())
    }
}

impl Iterator for HeapFileIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(HeapFileIterator::next(self)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
