mod aggregation_executor;
mod delete_executor;
mod distinct_executor;
mod executor;
mod executor_context;
mod expression;
mod hash_join_executor;
mod insert_executor;
mod nested_loop_join_executor;
mod plan;
mod seq_scan_executor;
mod update_executor;

pub use aggregation_executor::{AggregateKey, AggregationExecutor, AggregationHashTable};
pub use delete_executor::DeleteExecutor;
pub use distinct_executor::DistinctExecutor;
pub use executor::Executor;
pub use executor_context::ExecutorContext;
pub use expression::{ComparisonOp, Expression};
pub use hash_join_executor::HashJoinExecutor;
pub use insert_executor::InsertExecutor;
pub use nested_loop_join_executor::NestedLoopJoinExecutor;
pub use plan::{
    AggregationPlan, AggregationType, DeletePlan, HashJoinPlan, InsertPlan, NestedLoopJoinPlan,
    SeqScanPlan, UpdateInfo, UpdatePlan, UpdateType,
};
pub use seq_scan_executor::SeqScanExecutor;
pub use update_executor::UpdateExecutor;
