//! Integration tests for the buffer pool

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Barrier};
use std::thread;

use quarry::buffer::BufferPool;
use quarry::catalog::Catalog;
use quarry::common::{PageId, Permissions, QuarryError, TableId, TransactionId};
use quarry::storage::page::HeapPage;
use quarry::tuple::{DataType, Tuple, TupleDesc, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

fn pair_desc() -> Arc<TupleDesc> {
    TupleDesc::builder()
        .field("k", DataType::Integer)
        .field("v", DataType::BigInt)
        .build_arc()
        .unwrap()
}

fn pair(k: i32, v: i64) -> Tuple {
    Tuple::new(pair_desc(), vec![Value::Integer(k), Value::BigInt(v)]).unwrap()
}

fn create_pool(capacity: usize) -> (Arc<BufferPool>, TableId, TempDir) {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new(4096));
    let table = catalog
        .create_table("pairs", dir.path().join("pairs.dat"), pair_desc(), Some("k"))
        .unwrap();
    (Arc::new(BufferPool::new(capacity, catalog)), table, dir)
}

/// Writes `n` empty pages straight to the table's file.
fn add_pages(pool: &BufferPool, table: TableId, n: u32) {
    let file = pool.catalog().database_file(table).unwrap();
    let start = file.num_pages().unwrap();
    for page_no in start..start + n {
        let page = HeapPage::empty(PageId::new(table, page_no), pair_desc(), 4096);
        file.write_page(&page).unwrap();
    }
}

fn fetch(pool: &BufferPool, table: TableId, page_no: u32) {
    pool.get_page(TransactionId::new(), PageId::new(table, page_no), Permissions::ReadOnly)
        .unwrap();
}

/// Reads every live (k, v) pair through a fresh pool.
fn scan_pairs(pool: &Arc<BufferPool>, table: TableId) -> HashMap<i32, i64> {
    let file = pool.catalog().database_file(table).unwrap();
    let mut it = file.iterator(pool.clone(), TransactionId::new());
    it.open().unwrap();
    it.map(|t| {
        let t = t.unwrap();
        (
            t.field(0).unwrap().as_i64().unwrap() as i32,
            t.field(1).unwrap().as_i64().unwrap(),
        )
    })
    .collect()
}

#[test]
fn test_lru_evicts_least_recently_used() {
    let k = 4;
    let (pool, table, _dir) = create_pool(k);
    add_pages(&pool, table, k as u32 + 1);

    for page_no in 0..k as u32 {
        fetch(&pool, table, page_no);
    }
    // touch page 0 so page 1 becomes the LRU victim
    fetch(&pool, table, 0);
    fetch(&pool, table, k as u32);

    assert_eq!(pool.cached_pages(), k);
    assert!(pool.is_cached(PageId::new(table, 0)));
    assert!(!pool.is_cached(PageId::new(table, 1)));
    assert!(pool.is_cached(PageId::new(table, k as u32)));
    assert_eq!(
        pool.cached_page_ids(),
        vec![
            PageId::new(table, 4),
            PageId::new(table, 0),
            PageId::new(table, 3),
            PageId::new(table, 2),
        ]
    );
    assert_eq!(pool.stats().snapshot().evictions, 1);
}

#[test]
fn test_cache_never_exceeds_capacity() {
    let (pool, table, _dir) = create_pool(5);
    add_pages(&pool, table, 20);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        fetch(&pool, table, rng.gen_range(0..20));
        assert!(pool.cached_pages() <= pool.capacity());
    }
    let stats = pool.stats().snapshot();
    assert_eq!(stats.hits + stats.misses, 500);
    assert_eq!(stats.misses, stats.pages_read);
}

#[test]
fn test_dirty_page_written_back_on_eviction() {
    let (pool, table, _dir) = create_pool(1);
    add_pages(&pool, table, 2);
    let tid = TransactionId::new();

    let mut t = pair(1, 100);
    pool.insert_tuple(tid, table, &mut t).unwrap();
    let pid = t.record_id().unwrap().page_id;
    assert_eq!(pid, PageId::new(table, 0));
    let cached = pool.get_page(tid, pid, Permissions::ReadOnly).unwrap();
    let cached_bytes = cached.read().page_data().unwrap();

    fetch(&pool, table, 1);
    assert!(!pool.is_cached(pid));
    assert_eq!(pool.stats().snapshot().pages_written, 1);

    let file = pool.catalog().database_file(table).unwrap();
    let on_disk = file.read_page(pid).unwrap();
    assert_eq!(on_disk.page_data().unwrap(), cached_bytes);
    assert_eq!(on_disk.is_dirty(), None);
}

#[test]
fn test_clean_page_eviction_skips_write() {
    let (pool, table, _dir) = create_pool(1);
    add_pages(&pool, table, 2);
    fetch(&pool, table, 0);
    fetch(&pool, table, 1);
    let stats = pool.stats().snapshot();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.pages_written, 0);
}

#[test]
fn test_evict_from_empty_pool() {
    let (pool, _table, _dir) = create_pool(3);
    assert!(matches!(pool.evict_page(), Err(QuarryError::BufferPoolFull)));
    assert_eq!(
        pool.evict_page().unwrap_err().kind(),
        quarry::ErrorKind::BufferPoolFull
    );
}

#[test]
fn test_flush_all_then_reload_matches() {
    let (pool, table, dir) = create_pool(8);
    let tid = TransactionId::new();
    for k in 0..300 {
        let mut t = pair(k, -(k as i64));
        pool.insert_tuple(tid, table, &mut t).unwrap();
    }
    pool.flush_all_pages().unwrap();
    pool.transaction_complete(tid, true);

    // a second catalog over the same file sees everything
    let catalog = Arc::new(Catalog::new(4096));
    let reopened = catalog
        .create_table("pairs", dir.path().join("pairs.dat"), pair_desc(), None)
        .unwrap();
    let fresh = Arc::new(BufferPool::new(2, catalog));
    let pairs = scan_pairs(&fresh, reopened);
    assert_eq!(pairs.len(), 300);
    assert!(pairs.iter().all(|(k, v)| *v == -(*k as i64)));
}

#[test]
fn test_concurrent_inserts() {
    let (pool, table, _dir) = create_pool(4);
    let threads = 8;
    let per_thread = 150;

    let handles: Vec<_> = (0..threads)
        .map(|n| {
            let pool = pool.clone();
            thread::spawn(move || {
                let tid = TransactionId::new();
                let mut rids = Vec::new();
                for i in 0..per_thread {
                    let mut t = pair(n * per_thread + i, n as i64);
                    pool.insert_tuple(tid, table, &mut t).unwrap();
                    rids.push(t.record_id().unwrap());
                }
                rids
            })
        })
        .collect();

    let mut all = HashSet::new();
    for h in handles {
        for rid in h.join().unwrap() {
            assert!(all.insert(rid), "record id {:?} handed out twice", rid);
        }
    }
    assert!(pool.cached_pages() <= 4);

    let pairs = scan_pairs(&pool, table);
    assert_eq!(pairs.len(), (threads * per_thread) as usize);
    for (k, v) in pairs {
        assert_eq!(v, (k / per_thread) as i64);
    }
}

#[test]
fn test_concurrent_readers_share_pages() {
    let (pool, table, _dir) = create_pool(3);
    add_pages(&pool, table, 6);

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let pool = pool.clone();
            thread::spawn(move || {
                for i in 0..200u32 {
                    let page_no = (i + n) % 6;
                    let page = pool
                        .get_page(TransactionId::new(), PageId::new(table, page_no), Permissions::ReadOnly)
                        .unwrap();
                    assert_eq!(page.read().id().page_no, page_no);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(pool.cached_pages() <= 3);
}

#[test]
fn test_concurrent_misses_load_one_copy() {
    let rounds = 20;
    let threads = 8;
    let (pool, table, _dir) = create_pool(rounds as usize);
    add_pages(&pool, table, rounds);

    for page_no in 0..rounds {
        let pid = PageId::new(table, page_no);
        let reads_before = pool.stats().snapshot().pages_read;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    pool.get_page(TransactionId::new(), pid, Permissions::ReadOnly)
                        .unwrap()
                })
            })
            .collect();
        let pages: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(pages.iter().all(|p| Arc::ptr_eq(p, &pages[0])));
        assert_eq!(pool.stats().snapshot().pages_read, reads_before + 1);
    }
    assert_eq!(pool.stats().snapshot().misses, rounds as u64);
}

#[test]
fn test_random_workload_matches_model() {
    let (pool, table, dir) = create_pool(3);
    let mut rng = StdRng::seed_from_u64(42);
    let tid = TransactionId::new();
    let mut model: HashMap<i32, Tuple> = HashMap::new();
    let mut next_key = 0;

    for _ in 0..2000 {
        if model.is_empty() || rng.gen_bool(0.6) {
            let mut t = pair(next_key, rng.gen());
            pool.insert_tuple(tid, table, &mut t).unwrap();
            model.insert(next_key, t);
            next_key += 1;
        } else {
            let keys: Vec<i32> = model.keys().copied().collect();
            let key = keys[rng.gen_range(0..keys.len())];
            let t = model.remove(&key).unwrap();
            pool.delete_tuple(tid, &t).unwrap();
        }
        assert!(pool.cached_pages() <= 3);
    }

    let expected: HashMap<i32, i64> = model
        .iter()
        .map(|(k, t)| (*k, t.field(1).unwrap().as_i64().unwrap()))
        .collect();
    assert_eq!(scan_pairs(&pool, table), expected);

    pool.flush_all_pages().unwrap();
    let catalog = Arc::new(Catalog::new(4096));
    let reopened = catalog
        .create_table("pairs", dir.path().join("pairs.dat"), pair_desc(), None)
        .unwrap();
    let fresh = Arc::new(BufferPool::new(3, catalog));
    assert_eq!(scan_pairs(&fresh, reopened), expected);
}
