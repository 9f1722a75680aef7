use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Permissions, QuarryError, Result, TableId, TransactionId};
use crate::storage::page::HeapPage;
use crate::tuple::{Tuple, TupleDesc};

use super::HeapFileIterator;

/// A table stored as an append-only sequence of heap pages in one file.
///
/// Page `n` occupies bytes `[n * page_size, (n + 1) * page_size)`. The page
/// count is derived from the file length, so it always reflects what is on
/// disk. Reads and writes go straight to the file; everything above this
/// layer reaches pages through the [`BufferPool`].
pub struct HeapFile {
    id: TableId,
    path: PathBuf,
    desc: Arc<TupleDesc>,
    page_size: usize,
    slots_per_page: usize,
    file: Mutex<File>,
}

impl HeapFile {
    /// Opens (creating if needed) the heap file at `path` for table `id`.
    ///
    /// Fails with a schema error, before touching the file, when pages of
    /// `page_size` bytes cannot hold `desc`'s tuples.
    pub fn open<P: AsRef<Path>>(
        id: TableId,
        path: P,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> Result<Self> {
        let slots_per_page = HeapPage::validate_layout(page_size, &desc)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        Ok(Self {
            id,
            path: path.as_ref().to_path_buf(),
            desc,
            page_size,
            slots_per_page,
            file: Mutex::new(file),
        })
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Tuple slots on each page of this file.
    pub fn slots_per_page(&self) -> usize {
        self.slots_per_page
    }

    /// Returns the number of whole pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        let len = self.file.lock().metadata()?.len();
        Ok((len / self.page_size as u64) as u32)
    }

    /// Reads and decodes one page straight from disk.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        if pid.table_id != self.id {
            return Err(QuarryError::ForeignPage {
                page_id: pid,
                table_id: self.id,
            });
        }

        let mut data = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            let len = file.metadata()?.len();
            let offset = pid.offset(self.page_size);
            if offset + self.page_size as u64 > len {
                return Err(QuarryError::PageOutOfBounds {
                    page_id: pid,
                    num_pages: (len / self.page_size as u64) as u32,
                });
            }
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut data)?;
        }

        HeapPage::new(pid, self.desc.clone(), &data)
    }

    /// Writes a page back at the offset given by its id.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.id();
        if pid.table_id != self.id {
            return Err(QuarryError::ForeignPage {
                page_id: pid,
                table_id: self.id,
            });
        }
        let data = page.page_data()?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }

    /// Appends an empty page to the file and returns its id.
    ///
    /// The page is on disk before this returns, so the buffer pool can fetch
    /// it like any other page.
    pub(crate) fn append_empty_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();
        let len = file.seek(SeekFrom::End(0))?;
        let page_no = (len / self.page_size as u64) as u32;
        let offset = page_no as u64 * self.page_size as u64;

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&HeapPage::create_empty_page_data(self.page_size))?;
        file.flush()?;

        let pid = PageId::new(self.id, page_no);
        debug!("appended {} to {}", pid, self.path.display());
        Ok(pid)
    }

    /// Stores `tuple` in the first page with a free slot, growing the file by
    /// one page when every existing page is full. Sets the tuple's record id
    /// and returns the page it landed on.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(QuarryError::schema(format!(
                "tuple ({}) does not match table {} ({})",
                tuple.tuple_desc(),
                self.id,
                self.desc
            )));
        }
        // appending would never make room
        if self.slots_per_page == 0 {
            return Err(QuarryError::schema(format!(
                "pages of table {} have no room for a tuple",
                self.id
            )));
        }

        let mut next_page = 0;
        loop {
            let num_pages = self.num_pages()?;
            while next_page < num_pages {
                let pid = PageId::new(self.id, next_page);
                let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
                {
                    let mut guard = page.write();
                    if guard.is_retired() {
                        // evicted between fetch and lock, fetch it again
                        continue;
                    }
                    if guard.num_empty_slots() > 0 {
                        let rid = guard.insert_tuple(tuple.clone())?;
                        guard.mark_dirty(true, tid);
                        tuple.set_record_id(Some(rid));
                        drop(guard);
                        return Ok(vec![page]);
                    }
                }
                pool.release_page(tid, pid);
                next_page += 1;
            }

            // Every page was full. Another inserter may append concurrently,
            // in which case the next pass picks up from where this one ended.
            self.append_empty_page()?;
        }
    }

    /// Clears the tuple's slot on the page named by its record id.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let rid = tuple.record_id().ok_or(QuarryError::MissingRecordId)?;
        if rid.page_id.table_id != self.id {
            return Err(QuarryError::ForeignPage {
                page_id: rid.page_id,
                table_id: self.id,
            });
        }

        loop {
            let page = pool.get_page(tid, rid.page_id, Permissions::ReadWrite)?;
            let mut guard = page.write();
            if guard.is_retired() {
                continue;
            }
            guard.delete_tuple(tuple)?;
            guard.mark_dirty(true, tid);
            drop(guard);
            return Ok(vec![page]);
        }
    }

    /// Returns a cursor over every live tuple in the file.
    pub fn iterator(self: &Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator::new(self.clone(), pool, tid)
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("desc", &self.desc.to_string())
            .field("page_size", &self.page_size)
            .field("slots_per_page", &self.slots_per_page)
            .finish()
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}
