//! Integration tests for operator trees over real tables

use std::sync::Arc;

use quarry::execution::{
    collect_tuples, Aggregate, AggregateOp, Delete, Filter, Insert, Op, OpIterator, Predicate,
    SeqScan, TupleIterator,
};
use quarry::tuple::{DataType, Tuple, TupleDesc, Value};
use quarry::{Config, Database, QuarryError, TableId, TransactionId};
use tempfile::TempDir;

fn orders_desc() -> Arc<TupleDesc> {
    TupleDesc::builder()
        .field("id", DataType::Integer)
        .field("region", DataType::Text(8))
        .field("amount", DataType::Integer)
        .build_arc()
        .unwrap()
}

fn order(id: i32, region: &str, amount: i32) -> Tuple {
    Tuple::new(
        orders_desc(),
        vec![Value::Integer(id), Value::from(region), Value::Integer(amount)],
    )
    .unwrap()
}

fn setup(pool_pages: usize) -> (Database, TableId, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(Config::default().with_buffer_pool_pages(pool_pages));
    let table = db
        .create_table("orders", dir.path().join("orders.dat"), orders_desc(), Some("id"))
        .unwrap();
    (db, table, dir)
}

fn load(db: &Database, table: TableId, rows: Vec<Tuple>) -> i32 {
    let source = TupleIterator::new(orders_desc(), rows).unwrap();
    let mut insert = Insert::new(
        TransactionId::new(),
        Box::new(source),
        table,
        db.buffer_pool().clone(),
    )
    .unwrap();
    insert.open().unwrap();
    let count = insert.next().unwrap();
    insert.close();
    match count.field(0).unwrap() {
        Value::Integer(n) => *n,
        other => panic!("unexpected count {:?}", other),
    }
}

fn scan(db: &Database, table: TableId) -> SeqScan {
    SeqScan::new(db.buffer_pool().clone(), TransactionId::new(), table, "o").unwrap()
}

fn sample_rows() -> Vec<Tuple> {
    let regions = ["north", "south", "east"];
    (0..30)
        .map(|i| order(i, regions[i as usize % 3], i * 10))
        .collect()
}

#[test]
fn test_insert_then_scan() {
    let (db, table, _dir) = setup(10);
    assert_eq!(load(&db, table, sample_rows()), 30);

    let mut s = scan(&db, table);
    assert_eq!(s.table_name(), "orders");
    assert_eq!(s.alias(), "o");
    assert_eq!(s.tuple_desc().field_name(2).unwrap(), Some("o.amount"));

    s.open().unwrap();
    let rows = collect_tuples(&mut s).unwrap();
    assert_eq!(rows.len(), 30);
    for (i, t) in rows.iter().enumerate() {
        assert_eq!(t.field(0).unwrap(), &Value::Integer(i as i32));
        assert!(t.record_id().is_some());
        assert_eq!(t.tuple_desc().field_name(0).unwrap(), Some("o.id"));
    }
}

#[test]
fn test_insert_is_single_shot() {
    let (db, table, _dir) = setup(10);
    let source = TupleIterator::new(orders_desc(), sample_rows()).unwrap();
    let mut insert = Insert::new(
        TransactionId::new(),
        Box::new(source),
        table,
        db.buffer_pool().clone(),
    )
    .unwrap();
    assert_eq!(insert.tuple_desc().field_name(0).unwrap(), Some("count"));

    insert.open().unwrap();
    assert!(insert.has_next().unwrap());
    assert_eq!(insert.next().unwrap().field(0).unwrap(), &Value::Integer(30));
    assert!(!insert.has_next().unwrap());
    assert!(matches!(insert.next(), Err(QuarryError::NoSuchElement(_))));

    insert.rewind().unwrap();
    assert!(!insert.has_next().unwrap());

    let mut s = scan(&db, table);
    s.open().unwrap();
    assert_eq!(collect_tuples(&mut s).unwrap().len(), 30);
}

#[test]
fn test_insert_rejects_mismatched_child() {
    let (db, table, _dir) = setup(10);
    let desc = TupleDesc::from_types(&[DataType::Integer]).unwrap().into_arc();
    let source = TupleIterator::new(desc, Vec::new()).unwrap();
    let result = Insert::new(
        TransactionId::new(),
        Box::new(source),
        table,
        db.buffer_pool().clone(),
    );
    assert!(matches!(result, Err(QuarryError::Schema(_))));
}

#[test]
fn test_filter_over_scan() {
    let (db, table, _dir) = setup(10);
    load(&db, table, sample_rows());

    let pred = Predicate::new(2, Op::GreaterThanOrEq, 200);
    let mut filter = Filter::new(pred, Box::new(scan(&db, table)));
    filter.open().unwrap();
    let rows = collect_tuples(&mut filter).unwrap();
    assert_eq!(rows.len(), 10);
    assert!(rows
        .iter()
        .all(|t| t.field(2).unwrap().as_i64().unwrap() >= 200));

    filter.rewind().unwrap();
    assert_eq!(collect_tuples(&mut filter).unwrap(), rows);

    let like = Predicate::new(1, Op::Like, "th");
    let mut filter = Filter::new(like, Box::new(scan(&db, table)));
    filter.open().unwrap();
    // north and south
    assert_eq!(collect_tuples(&mut filter).unwrap().len(), 20);
}

#[test]
fn test_delete_filtered_rows() {
    let (db, table, _dir) = setup(10);
    load(&db, table, sample_rows());

    let tid = TransactionId::new();
    let source = SeqScan::new(db.buffer_pool().clone(), tid, table, "o").unwrap();
    let pred = Predicate::new(1, Op::Equals, "east");
    let filter = Filter::new(pred, Box::new(source));
    let mut delete = Delete::new(tid, Box::new(filter), db.buffer_pool().clone());
    delete.open().unwrap();
    assert_eq!(delete.next().unwrap().field(0).unwrap(), &Value::Integer(10));
    assert!(!delete.has_next().unwrap());
    delete.close();

    let mut s = scan(&db, table);
    s.open().unwrap();
    let left = collect_tuples(&mut s).unwrap();
    assert_eq!(left.len(), 20);
    assert!(left.iter().all(|t| t.field(1).unwrap() != &Value::from("east")));
}

#[test]
fn test_delete_skips_rows_without_location() {
    let (db, _table, _dir) = setup(10);
    // tuples from memory carry no record id
    let source = TupleIterator::new(orders_desc(), sample_rows()).unwrap();
    let mut delete = Delete::new(TransactionId::new(), Box::new(source), db.buffer_pool().clone());
    delete.open().unwrap();
    assert_eq!(delete.next().unwrap().field(0).unwrap(), &Value::Integer(0));
}

#[test]
fn test_count_over_five() {
    let (db, table, _dir) = setup(10);
    load(&db, table, (0..5).map(|i| order(i, "west", i)).collect());

    let mut agg = Aggregate::new(Box::new(scan(&db, table)), 0, None, AggregateOp::Count).unwrap();
    assert_eq!(agg.tuple_desc().field_name(0).unwrap(), Some("COUNT(o.id)"));
    agg.open().unwrap();
    let out = collect_tuples(&mut agg).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].field(0).unwrap(), &Value::Integer(5));
}

#[test]
fn test_grouped_aggregate_over_filter() {
    let (db, table, _dir) = setup(10);
    load(&db, table, sample_rows());

    let filter = Filter::new(
        Predicate::new(2, Op::LessThan, 150),
        Box::new(scan(&db, table)),
    );
    let mut agg = Aggregate::new(Box::new(filter), 2, Some(1), AggregateOp::Sum).unwrap();
    assert_eq!(agg.tuple_desc().field_name(0).unwrap(), Some("o.region"));
    assert_eq!(agg.tuple_desc().field_name(1).unwrap(), Some("SUM(o.amount)"));

    agg.open().unwrap();
    let out: Vec<Vec<Value>> = collect_tuples(&mut agg)
        .unwrap()
        .into_iter()
        .map(|t| t.fields().to_vec())
        .collect();
    // ids 0..15: north 0,3,..,12 / south 1,4,..,13 / east 2,5,..,14
    assert_eq!(
        out,
        vec![
            vec![Value::from("north"), Value::Integer(300)],
            vec![Value::from("south"), Value::Integer(350)],
            vec![Value::from("east"), Value::Integer(400)],
        ]
    );

    agg.rewind().unwrap();
    assert_eq!(collect_tuples(&mut agg).unwrap().len(), 3);
}

#[test]
fn test_operators_require_open() {
    let (db, table, _dir) = setup(10);
    let mut s = scan(&db, table);
    assert!(matches!(s.has_next(), Err(QuarryError::IteratorNotOpen)));
    s.open().unwrap();
    // empty table
    assert!(!s.has_next().unwrap());
    assert!(!s.has_next().unwrap());
    s.close();
    assert!(matches!(s.next(), Err(QuarryError::IteratorNotOpen)));
}

#[test]
fn test_scan_larger_than_pool() {
    let (db, table, _dir) = setup(2);
    let rows: Vec<Tuple> = (0..2000).map(|i| order(i, "x", i)).collect();
    assert_eq!(load(&db, table, rows), 2000);
    assert!(db.catalog().database_file(table).unwrap().num_pages().unwrap() > 2);

    let mut agg = Aggregate::new(Box::new(scan(&db, table)), 2, None, AggregateOp::Max).unwrap();
    agg.open().unwrap();
    assert_eq!(agg.next().unwrap().field(0).unwrap(), &Value::Integer(1999));
    assert!(db.buffer_pool().cached_pages() <= 2);
}
