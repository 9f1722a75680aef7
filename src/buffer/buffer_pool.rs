use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::catalog::Catalog;
use crate::common::{PageId, Permissions, QuarryError, Result, TableId, TransactionId};
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

use super::{BufferPoolStats, LockManager, LruReplacer, NoopLockManager};

/// Shared handle to a cached page.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Cache contents and their recency order, always updated together
struct PoolState {
    pages: HashMap<PageId, PageRef>,
    replacer: LruReplacer,
}

/// BufferPool caches decoded heap pages for every table and is the only
/// component that reads pages from or writes pages to heap files.
///
/// At most `capacity` pages are cached. Misses beyond that evict the least
/// recently used page, writing it back first if it is dirty.
///
/// ## Concurrency
///
/// - `state` guards the page map and LRU chain. It is held only for map and
///   chain updates, never while a page is read from or written to disk and
///   never while waiting for a page lock, so lookups of different pages do
///   not wait on each other's I/O.
/// - Eviction drops only clean victims it can lock without waiting. A dirty
///   or busy victim is written back with `state` released and the victim is
///   chosen again.
/// - Misses on the same page serialize on a per-page load latch and re-check
///   the cache after acquiring it, so each page has one cached copy.
/// - Locks are taken in the order state, then page. Nothing holds a page
///   lock while calling back into the pool.
/// - Eviction and `discard_page` retire the dropped copy under its write
///   lock. Writers check for retirement after locking a page and fetch it
///   again, so no change lands in a copy the pool no longer tracks.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    state: Mutex<PoolState>,
    loading: Mutex<HashMap<PageId, Arc<Mutex<()>>>>,
    lock_manager: Box<dyn LockManager>,
    stats: BufferPoolStats,
}

impl BufferPool {
    /// Creates a pool holding up to `capacity` pages of the catalog's tables.
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> Self {
        Self::with_lock_manager(capacity, catalog, Box::new(NoopLockManager))
    }

    /// Creates a pool that consults `lock_manager` on every page request.
    pub fn with_lock_manager(
        capacity: usize,
        catalog: Arc<Catalog>,
        lock_manager: Box<dyn LockManager>,
    ) -> Self {
        Self {
            capacity,
            catalog,
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(capacity),
                replacer: LruReplacer::with_capacity(capacity),
            }),
            loading: Mutex::new(HashMap::new()),
            lock_manager,
            stats: BufferPoolStats::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Returns the maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.state.lock().pages.contains_key(&pid)
    }

    /// Cached page ids from most to least recently used.
    pub fn cached_page_ids(&self) -> Vec<PageId> {
        self.state.lock().replacer.iter().collect()
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Returns the page, reading it from its heap file on a miss.
    ///
    /// Either way the page becomes the most recently used one.
    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permissions) -> Result<PageRef> {
        self.lock_manager.acquire(tid, pid, perm)?;

        if let Some(page) = self.lookup(pid) {
            return Ok(page);
        }

        let latch = self.loading.lock().entry(pid).or_default().clone();
        let result = {
            let _loading = latch.lock();
            self.load(pid)
        };

        // latches are cloned under `loading`, so a count of one means no
        // loader holds or is about to take this one
        drop(latch);
        let mut loading = self.loading.lock();
        if loading.get(&pid).is_some_and(|l| Arc::strong_count(l) == 1) {
            loading.remove(&pid);
        }
        result
    }

    /// Inserts `tuple` into table `table_id` on behalf of `tid`, setting its
    /// record id. Every page touched is marked dirty and kept cached.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        let file = self.catalog.database_file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.cache_dirty_pages(tid, pages);
        Ok(())
    }

    /// Deletes `tuple` from the table its record id points into.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(QuarryError::MissingRecordId)?;
        let file = self.catalog.database_file(rid.page_id.table_id)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.cache_dirty_pages(tid, pages);
        Ok(())
    }

    /// Writes every dirty cached page back to its heap file.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<PageRef> = self.state.lock().pages.values().cloned().collect();
        for page in pages {
            self.write_back(&mut page.write())?;
        }
        Ok(())
    }

    /// Writes back the cached pages last dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let pages: Vec<PageRef> = self.state.lock().pages.values().cloned().collect();
        for page in pages {
            let mut guard = page.write();
            if guard.is_dirty() == Some(tid) {
                self.write_back(&mut guard)?;
            }
        }
        Ok(())
    }

    /// Writes one page back if it is cached and dirty.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let page = self.state.lock().pages.get(&pid).cloned();
        match page {
            Some(page) => self.write_back(&mut page.write()),
            None => Ok(()),
        }
    }

    /// Evicts the least recently used page, writing it back if dirty.
    ///
    /// Fails with `BufferPoolFull` when nothing is cached.
    pub fn evict_page(&self) -> Result<PageId> {
        let (pid, _state) = self.evict(self.state.lock())?;
        Ok(pid)
    }

    /// Drops a page from the cache without writing it back.
    pub fn discard_page(&self, pid: PageId) {
        let mut state = self.state.lock();
        if let Some(page) = state.pages.remove(&pid) {
            page.write().retire();
            state.replacer.remove(pid);
            debug!("discarded {}", pid);
        }
    }

    /// Releases `tid`'s lock on a page before the transaction ends.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Ends `tid`, releasing whatever locks it holds. Dirty pages stay
    /// cached until they are flushed or evicted.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) {
        debug!(
            "{} {}",
            tid,
            if commit { "committed" } else { "aborted" }
        );
        self.lock_manager.release_all(tid);
    }

    /// Cache hit path: returns the page and promotes it.
    fn lookup(&self, pid: PageId) -> Option<PageRef> {
        let mut state = self.state.lock();
        let page = state.pages.get(&pid).cloned()?;
        state.replacer.record_access(pid);
        self.stats.record_hit();
        Some(page)
    }

    /// Miss path, run while holding the page's load latch.
    fn load(&self, pid: PageId) -> Result<PageRef> {
        if let Some(page) = self.lookup(pid) {
            return Ok(page);
        }
        self.stats.record_miss();

        let file = self.catalog.database_file(pid.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        self.stats.record_read();
        debug!("cache miss: read {} from disk", pid);

        let mut state = self.state.lock();
        // eviction may release the lock, so the size is checked again each time
        while state.pages.len() >= self.capacity {
            state = self.evict(state)?.1;
        }
        if let Some(cached) = state.pages.get(&pid).cloned() {
            // another loader won the race
            state.replacer.record_access(pid);
            return Ok(cached);
        }
        state.pages.insert(pid, page.clone());
        state.replacer.record_access(pid);
        Ok(page)
    }

    /// Marks pages dirty for `tid` and promotes them to most recently used.
    ///
    /// A page evicted since it was modified was already written back
    /// because heap files mark pages dirty under the page lock, so it is
    /// left out of the cache.
    fn cache_dirty_pages(&self, tid: TransactionId, pages: Vec<PageRef>) {
        for page in pages {
            let pid = {
                let mut guard = page.write();
                if guard.is_retired() {
                    debug!("{} left the cache after being modified", guard.id());
                    continue;
                }
                guard.mark_dirty(true, tid);
                guard.id()
            };

            let mut state = self.state.lock();
            match state.pages.get(&pid) {
                Some(cached) if Arc::ptr_eq(cached, &page) => state.replacer.record_access(pid),
                _ => debug!("{} left the cache after being modified", pid),
            }
        }
    }

    /// Drops the least recently used page and hands back the state lock.
    ///
    /// Only a clean victim whose lock is free is dropped under `state`.
    /// Otherwise `state` is released while the victim is written back under
    /// its own lock, and the choice is made again. A failed write-back
    /// leaves the page cached.
    fn evict<'a>(
        &'a self,
        mut state: MutexGuard<'a, PoolState>,
    ) -> Result<(PageId, MutexGuard<'a, PoolState>)> {
        loop {
            let pid = state.replacer.victim().ok_or(QuarryError::BufferPoolFull)?;
            let Some(page) = state.pages.get(&pid).cloned() else {
                state.replacer.remove(pid);
                continue;
            };

            if let Some(mut guard) = page.try_write() {
                if guard.is_dirty().is_none() {
                    guard.retire();
                    drop(guard);
                    state.replacer.remove(pid);
                    state.pages.remove(&pid);
                    self.stats.record_eviction();
                    debug!("evicted {}", pid);
                    return Ok((pid, state));
                }
            }

            drop(state);
            self.write_back(&mut page.write())?;
            state = self.state.lock();
        }
    }

    fn write_back(&self, page: &mut HeapPage) -> Result<()> {
        let Some(tid) = page.is_dirty() else {
            return Ok(());
        };
        let file = self.catalog.database_file(page.id().table_id)?;
        file.write_page(page)?;
        page.mark_dirty(false, tid);
        self.stats.record_write();
        debug!("flushed {} dirtied by {}", page.id(), tid);
        Ok(())
    }
}
