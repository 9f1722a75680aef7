//! Integration tests for heap files and their iterators

use std::sync::Arc;

use quarry::buffer::BufferPool;
use quarry::catalog::Catalog;
use quarry::common::{PageId, Permissions, QuarryError, TableId, TransactionId};
use quarry::storage::disk::HeapFile;
use quarry::storage::page::HeapPage;
use quarry::tuple::{DataType, Tuple, TupleDesc, Value};
use tempfile::TempDir;

/// Five INTEGER fields: 20-byte tuples, 203 per 4 KB page.
fn wide_desc() -> Arc<TupleDesc> {
    TupleDesc::from_types(&[DataType::Integer; 5]).unwrap().into_arc()
}

fn wide_tuple(desc: &Arc<TupleDesc>, i: i32) -> Tuple {
    Tuple::new(desc.clone(), (0..5).map(|f| Value::Integer(i * 10 + f)).collect()).unwrap()
}

fn setup(capacity: usize) -> (Arc<BufferPool>, TableId, TempDir) {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new(4096));
    let table = catalog
        .create_table("wide", dir.path().join("wide.dat"), wide_desc(), None)
        .unwrap();
    (Arc::new(BufferPool::new(capacity, catalog)), table, dir)
}

#[test]
fn test_overflowing_one_page_appends_a_second() {
    let (pool, table, _dir) = setup(10);
    let desc = wide_desc();
    let per_page = HeapPage::num_slots_for(4096, desc.size());
    assert_eq!(per_page, 203);

    let tid = TransactionId::new();
    for i in 0..=per_page as i32 {
        let mut t = wide_tuple(&desc, i);
        pool.insert_tuple(tid, table, &mut t).unwrap();
    }

    let file = pool.catalog().database_file(table).unwrap();
    assert_eq!(file.num_pages().unwrap(), 2);

    let first = pool
        .get_page(tid, PageId::new(table, 0), Permissions::ReadOnly)
        .unwrap();
    assert_eq!(first.read().num_empty_slots(), 0);
    let second = pool
        .get_page(tid, PageId::new(table, 1), Permissions::ReadOnly)
        .unwrap();
    assert_eq!(second.read().iter().count(), 1);
}

#[test]
fn test_iterator_visits_every_live_tuple_in_order() {
    let (pool, table, _dir) = setup(3);
    let desc = wide_desc();
    let tid = TransactionId::new();
    let mut stored = Vec::new();
    for i in 0..500 {
        let mut t = wide_tuple(&desc, i);
        pool.insert_tuple(tid, table, &mut t).unwrap();
        stored.push(t);
    }
    // drop every third tuple
    for t in stored.iter().step_by(3) {
        pool.delete_tuple(tid, t).unwrap();
    }

    let file = pool.catalog().database_file(table).unwrap();
    let mut it = file.iterator(pool.clone(), tid);
    it.open().unwrap();
    let seen: Vec<Tuple> = it.by_ref().collect::<Result<_, _>>().unwrap();
    let expected: Vec<&Tuple> = stored
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 0)
        .map(|(_, t)| t)
        .collect();
    assert_eq!(seen.len(), expected.len());
    for (got, want) in seen.iter().zip(&expected) {
        assert_eq!(got, *want);
        assert_eq!(got.record_id(), want.record_id());
    }

    assert!(!it.has_next().unwrap());
    assert!(matches!(it.next(), Err(QuarryError::NoSuchElement(_))));

    it.rewind().unwrap();
    assert_eq!(it.by_ref().count(), expected.len());
}

#[test]
fn test_iterator_lifecycle() {
    let (pool, table, _dir) = setup(4);
    let file = pool.catalog().database_file(table).unwrap();
    let tid = TransactionId::new();

    // closed: nothing to report, next is an error
    let mut it = file.iterator(pool.clone(), tid);
    assert!(!it.has_next().unwrap());
    assert!(matches!(it.next(), Err(QuarryError::IteratorNotOpen)));

    // an empty file opens to an exhausted scan
    it.open().unwrap();
    assert!(!it.has_next().unwrap());

    let mut t = wide_tuple(&wide_desc(), 1);
    pool.insert_tuple(tid, table, &mut t).unwrap();
    it.rewind().unwrap();
    for _ in 0..3 {
        assert!(it.has_next().unwrap());
    }
    it.close();
    assert!(!it.is_open());
    assert!(!it.has_next().unwrap());
}

#[test]
fn test_read_page_bounds() {
    let (pool, table, _dir) = setup(4);
    let file = pool.catalog().database_file(table).unwrap();
    assert!(matches!(
        file.read_page(PageId::new(table, 0)),
        Err(QuarryError::PageOutOfBounds { num_pages: 0, .. })
    ));
    assert!(matches!(
        file.read_page(PageId::new(TableId::new(999), 0)),
        Err(QuarryError::ForeignPage { .. })
    ));
}

#[test]
fn test_pages_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.dat");
    let desc = wide_desc();
    let table = TableId::new(1);

    {
        let file = HeapFile::open(table, &path, desc.clone(), 4096).unwrap();
        let mut page = HeapPage::empty(PageId::new(table, 0), desc.clone(), 4096);
        page.insert_tuple(wide_tuple(&desc, 4)).unwrap();
        page.insert_tuple(wide_tuple(&desc, 5)).unwrap();
        file.write_page(&page).unwrap();
        file.write_page(&HeapPage::empty(PageId::new(table, 1), desc.clone(), 4096))
            .unwrap();
    }

    let file = HeapFile::open(table, &path, desc.clone(), 4096).unwrap();
    assert_eq!(file.num_pages().unwrap(), 2);
    let page = file.read_page(PageId::new(table, 0)).unwrap();
    let values: Vec<_> = page.iter().map(|t| t.field(0).unwrap().clone()).collect();
    assert_eq!(values, vec![Value::Integer(40), Value::Integer(50)]);
    assert_eq!(file.read_page(PageId::new(table, 1)).unwrap().iter().count(), 0);
}

#[test]
fn test_insert_rejects_foreign_schema() {
    let (pool, table, _dir) = setup(4);
    let other = TupleDesc::from_types(&[DataType::Boolean]).unwrap().into_arc();
    let mut t = Tuple::new(other, vec![Value::Boolean(true)]).unwrap();
    let err = pool
        .insert_tuple(TransactionId::new(), table, &mut t)
        .unwrap_err();
    assert!(matches!(err, QuarryError::Schema(_)));
    assert_eq!(t.record_id(), None);
}

#[test]
fn test_delete_twice_reports_empty_slot() {
    let (pool, table, _dir) = setup(4);
    let tid = TransactionId::new();
    let mut t = wide_tuple(&wide_desc(), 9);
    pool.insert_tuple(tid, table, &mut t).unwrap();
    pool.delete_tuple(tid, &t).unwrap();
    assert!(matches!(
        pool.delete_tuple(tid, &t),
        Err(QuarryError::EmptySlot { .. })
    ));

    let unplaced = wide_tuple(&wide_desc(), 9);
    assert!(matches!(
        pool.delete_tuple(tid, &unplaced),
        Err(QuarryError::MissingRecordId)
    ));
}

#[test]
fn test_create_table_rejects_page_too_small_for_tuple() {
    let dir = TempDir::new().unwrap();
    let catalog = Catalog::new(64);
    let desc = TupleDesc::from_types(&[DataType::text()]).unwrap().into_arc();
    let path = dir.path().join("narrow.dat");

    let err = catalog
        .create_table("narrow", &path, desc, None)
        .unwrap_err();
    assert!(matches!(err, QuarryError::Schema(_)));
    assert!(catalog.table_id("narrow").is_err());
    assert!(!path.exists());
}

#[test]
fn test_create_table_rejects_zero_page_size() {
    let dir = TempDir::new().unwrap();
    let catalog = Catalog::new(0);
    let err = catalog
        .create_table("t", dir.path().join("t.dat"), wide_desc(), None)
        .unwrap_err();
    assert_eq!(err.kind(), quarry::ErrorKind::Schema);
}
