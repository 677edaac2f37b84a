//! Query execution: expressions, plans, and the pull-based executor
//! pipeline.

pub mod executor;
pub mod executors;
pub mod expression;
pub mod plan;
pub mod transaction;

pub use executor::{create_executor, execute_plan, Executor, ExecutorContext};
pub use expression::{evaluates_to_true, ComparisonOp, Expression, LogicOp};
pub use plan::{AggregationType, JoinType, OrderByDirection, PlanNode};
pub use transaction::Transaction;
