use std::process;

use quarry::execution::{
    collect_tuples, Aggregate, AggregateOp, Filter, Insert, Op, OpIterator, Predicate, SeqScan,
    TupleIterator,
};
use quarry::tuple::{DataType, Tuple, TupleDesc, Value};
use quarry::{Config, Database, Result, TransactionId};

fn main() {
    env_logger::init();

    println!("Quarry - a relational storage engine in Rust");
    println!("============================================\n");

    if let Err(e) = run() {
        eprintln!("demo failed: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("quarry-demo-{}", process::id()));
    std::fs::create_dir_all(&dir)?;

    let db = Database::new(Config::default().with_buffer_pool_pages(8));
    println!(
        "Buffer pool: {} pages of {} bytes",
        db.buffer_pool().capacity(),
        db.config().page_size
    );

    let desc = TupleDesc::builder()
        .field("id", DataType::Integer)
        .field("category", DataType::Text(12))
        .field("price", DataType::Integer)
        .build_arc()?;
    let table = db.create_table("products", dir.join("products.dat"), desc.clone(), Some("id"))?;
    println!("Created table 'products' as {}\n", table);

    // Insert
    let categories = ["tools", "paint", "garden", "lumber"];
    let rows = (0..1000)
        .map(|i| {
            Tuple::new(
                desc.clone(),
                vec![
                    Value::Integer(i),
                    Value::from(categories[i as usize % categories.len()]),
                    Value::Integer(i % 97),
                ],
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let tid = TransactionId::new();
    let source = TupleIterator::new(desc, rows)?;
    let mut insert = Insert::new(tid, Box::new(source), table, db.buffer_pool().clone())?;
    insert.open()?;
    let inserted = insert.next()?;
    insert.close();
    println!("Inserted {} rows", inserted);

    // Filter + aggregate: total price per category for prices above 50
    let scan = SeqScan::new(db.buffer_pool().clone(), tid, table, "p")?;
    let filter = Filter::new(Predicate::new(2, Op::GreaterThan, 50), Box::new(scan));
    let mut agg = Aggregate::new(Box::new(filter), 2, Some(1), AggregateOp::Sum)?;
    agg.open()?;
    println!("\n{}", agg.tuple_desc());
    for tuple in collect_tuples(&mut agg)? {
        println!("  {}", tuple);
    }
    agg.close();

    db.buffer_pool().flush_all_pages()?;
    db.buffer_pool().transaction_complete(tid, true);
    let pages = db.catalog().database_file(table)?.num_pages()?;
    println!("\nFlushed {} pages to {}", pages, dir.display());
    println!("Stats: {}", db.buffer_pool().stats().snapshot());

    drop(db);
    std::fs::remove_dir_all(&dir).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
