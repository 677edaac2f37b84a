//! The pull-based executors, one file per plan node.

pub mod aggregation;
pub mod delete;
pub mod external_merge_sort;
pub mod filter;
pub mod hash_join;
pub mod index_scan;
pub mod insert;
pub mod limit;
pub mod nested_index_join;
pub mod nested_loop_join;
pub mod seq_scan;
pub mod update;
pub mod values;

pub use aggregation::AggregationExecutor;
pub use delete::DeleteExecutor;
pub use external_merge_sort::ExternalMergeSortExecutor;
pub use filter::FilterExecutor;
pub use hash_join::HashJoinExecutor;
pub use index_scan::IndexScanExecutor;
pub use insert::InsertExecutor;
pub use limit::LimitExecutor;
pub use nested_index_join::NestedIndexJoinExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use seq_scan::SeqScanExecutor;
pub use update::UpdateExecutor;
pub use values::ValuesExecutor;
