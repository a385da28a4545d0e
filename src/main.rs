use std::sync::Arc;

use quarry::buffer::{BufferPool, ParallelBufferPool};
use quarry::catalog::Catalog;
use quarry::concurrency::{IsolationLevel, SimpleLockManager, Transaction};
use quarry::execution::{
    AggregationPlan, AggregationType, DistinctExecutor, Executor, ExecutorContext, Expression,
    InsertExecutor, InsertPlan, SeqScanExecutor, SeqScanPlan,
};
use quarry::storage::disk::DiskManager;
use quarry::tuple::{DataType, Schema, Value};

fn main() {
    env_logger::init();

    println!("Quarry - a disk-oriented RDBMS core in Rust");
    println!("===========================================\n");

    let db_path = "demo.db";
    let disk_manager = Arc::new(DiskManager::new(db_path).expect("failed to create disk manager"));
    println!("Created disk manager for: {}", db_path);

    // 2 instances x 16 frames, sharded by page id
    let pool: Arc<dyn BufferPool> = Arc::new(ParallelBufferPool::new(2, 16, disk_manager));
    println!("Created parallel buffer pool with {} frames\n", pool.pool_size());

    let mut catalog = Catalog::new(Arc::clone(&pool));
    let schema = Schema::shared(vec![
        ("id", DataType::Integer),
        ("name", DataType::VarChar(32)),
    ]);
    let table_info = catalog
        .create_table("users", schema)
        .expect("failed to create table");
    catalog
        .create_index("users_id", "users", vec![0])
        .expect("failed to create index");
    println!("Created table 'users' with a hash index on id");

    let ctx = Arc::new(ExecutorContext::new(
        Arc::new(catalog),
        Arc::new(Transaction::new(0, IsolationLevel::ReadCommitted)),
        Arc::new(SimpleLockManager::new()),
        Arc::clone(&pool),
    ));

    // insert a few rows, including a duplicate name
    let rows = vec![
        vec![Value::Integer(1), Value::Varchar("ada".into())],
        vec![Value::Integer(2), Value::Varchar("grace".into())],
        vec![Value::Integer(3), Value::Varchar("ada".into())],
    ];
    let mut insert = InsertExecutor::new(
        Arc::clone(&ctx),
        InsertPlan::raw(table_info.oid, rows),
        None,
    )
    .expect("failed to build insert");
    insert.init().expect("insert init failed");
    insert.next().expect("insert failed");
    println!("Inserted 3 rows\n");

    // distinct names
    let scan_names = SeqScanPlan {
        table_oid: table_info.oid,
        output_schema: Schema::shared(vec![("name", DataType::VarChar(32))]),
        output_exprs: vec![Expression::column(1)],
        predicate: None,
    };
    let scan = SeqScanExecutor::new(&ctx, scan_names).expect("failed to build scan");
    let mut distinct = DistinctExecutor::new(Box::new(scan));
    distinct.init().expect("distinct init failed");

    println!("Distinct names:");
    while let Some((tuple, _)) = distinct.next().expect("distinct failed") {
        println!("  {}", tuple.value(0).unwrap());
    }

    // count and sum over id
    let scan_all = SeqScanPlan::full(table_info.oid, Arc::clone(&table_info.schema));
    let scan = SeqScanExecutor::new(&ctx, scan_all).expect("failed to build scan");
    let agg_plan = AggregationPlan {
        output_schema: Schema::shared(vec![
            ("count", DataType::Integer),
            ("sum_id", DataType::Integer),
        ]),
        output_exprs: vec![Expression::Aggregate(0), Expression::Aggregate(1)],
        group_by_exprs: vec![],
        aggregate_exprs: vec![Expression::column(0), Expression::column(0)],
        agg_types: vec![AggregationType::Count, AggregationType::Sum],
        having: None,
    };
    let mut agg = quarry::execution::AggregationExecutor::new(agg_plan, Box::new(scan));
    agg.init().expect("aggregation init failed");
    if let Some((tuple, _)) = agg.next().expect("aggregation failed") {
        println!(
            "\nRow count: {}, sum of ids: {}",
            tuple.value(0).unwrap(),
            tuple.value(1).unwrap()
        );
    }

    pool.flush_all_pages().expect("flush failed");

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
