use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::catalog::Catalog;
use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple};

use super::executors::{
    AggregationExecutor, DeleteExecutor, ExternalMergeSortExecutor, FilterExecutor,
    HashJoinExecutor, IndexScanExecutor, InsertExecutor, LimitExecutor, NestedIndexJoinExecutor,
    NestedLoopJoinExecutor, SeqScanExecutor, UpdateExecutor, ValuesExecutor,
};
use super::plan::PlanNode;
use super::transaction::Transaction;

/// Shared collaborators handed to every executor.
pub struct ExecutorContext {
    pub catalog: Arc<Catalog>,
    pub bpm: Arc<BufferPoolManager>,
    pub transaction: Arc<Transaction>,
}

impl ExecutorContext {
    pub fn new(
        catalog: Arc<Catalog>,
        bpm: Arc<BufferPoolManager>,
        transaction: Arc<Transaction>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            bpm,
            transaction,
        })
    }
}

/// A pull-based executor. Parents call `init` once, then `next` until it
/// yields `None`; tuples flow bottom-up through the executor tree.
pub trait Executor {
    fn init(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>>;
    fn output_schema(&self) -> &Schema;
}

/// Builds the executor tree for a plan.
pub fn create_executor(ctx: &Arc<ExecutorContext>, plan: &PlanNode) -> Result<Box<dyn Executor>> {
    Ok(match plan {
        PlanNode::SeqScan {
            output_schema,
            table_oid,
            filter_predicate,
        } => Box::new(SeqScanExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            *table_oid,
            filter_predicate.clone(),
        )),
        PlanNode::IndexScan {
            output_schema,
            table_oid,
            index_oid,
            pred_keys,
            filter_predicate,
        } => Box::new(IndexScanExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            *table_oid,
            *index_oid,
            pred_keys.clone(),
            filter_predicate.clone(),
        )),
        PlanNode::Values {
            output_schema,
            rows,
        } => Box::new(ValuesExecutor::new(output_schema.clone(), rows.clone())),
        PlanNode::Filter {
            output_schema,
            predicate,
            child,
        } => Box::new(FilterExecutor::new(
            output_schema.clone(),
            predicate.clone(),
            create_executor(ctx, child)?,
        )),
        PlanNode::Limit {
            output_schema,
            limit,
            child,
        } => Box::new(LimitExecutor::new(
            output_schema.clone(),
            *limit,
            create_executor(ctx, child)?,
        )),
        PlanNode::Insert {
            output_schema,
            table_oid,
            child,
        } => Box::new(InsertExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            *table_oid,
            create_executor(ctx, child)?,
        )),
        PlanNode::Update {
            output_schema,
            table_oid,
            target_expressions,
            child,
        } => Box::new(UpdateExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            *table_oid,
            target_expressions.clone(),
            create_executor(ctx, child)?,
        )),
        PlanNode::Delete {
            output_schema,
            table_oid,
            child,
        } => Box::new(DeleteExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            *table_oid,
            create_executor(ctx, child)?,
        )),
        PlanNode::NestedLoopJoin {
            output_schema,
            join_type,
            predicate,
            left,
            right,
        } => Box::new(NestedLoopJoinExecutor::new(
            output_schema.clone(),
            *join_type,
            predicate.clone(),
            create_executor(ctx, left)?,
            create_executor(ctx, right)?,
        )?),
        PlanNode::HashJoin {
            output_schema,
            join_type,
            left_key_expressions,
            right_key_expressions,
            left,
            right,
        } => Box::new(HashJoinExecutor::new(
            output_schema.clone(),
            *join_type,
            left_key_expressions.clone(),
            right_key_expressions.clone(),
            create_executor(ctx, left)?,
            create_executor(ctx, right)?,
        )?),
        PlanNode::NestedIndexJoin {
            output_schema,
            join_type,
            key_expression,
            inner_table_oid,
            index_oid,
            child,
        } => Box::new(NestedIndexJoinExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            *join_type,
            key_expression.clone(),
            *inner_table_oid,
            *index_oid,
            create_executor(ctx, child)?,
        )?),
        PlanNode::Aggregation {
            output_schema,
            group_by_expressions,
            aggregates,
            child,
        } => Box::new(AggregationExecutor::new(
            output_schema.clone(),
            group_by_expressions.clone(),
            aggregates.clone(),
            create_executor(ctx, child)?,
        )),
        PlanNode::Sort {
            output_schema,
            order_by,
            child,
        } => Box::new(ExternalMergeSortExecutor::new(
            Arc::clone(ctx),
            output_schema.clone(),
            order_by.clone(),
            create_executor(ctx, child)?,
        )),
    })
}

/// Runs a plan to completion and collects its output tuples.
pub fn execute_plan(ctx: &Arc<ExecutorContext>, plan: &PlanNode) -> Result<Vec<Tuple>> {
    let mut executor = create_executor(ctx, plan)?;
    executor.init()?;
    let mut tuples = Vec::new();
    while let Some((tuple, _)) = executor.next()? {
        tuples.push(tuple);
    }
    Ok(tuples)
}
