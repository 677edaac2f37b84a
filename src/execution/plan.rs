use std::sync::Arc;

use crate::common::Oid;
use crate::tuple::{Schema, Value};

use super::expression::Expression;

/// Join flavor carried by join plan nodes. Only `Inner` and `Left` are
/// executable; the others are rejected when the executor is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Ascending,
    Descending,
}

/// A compiled query plan node. The planner (out of scope here) produces
/// these trees; the executor builder turns them into a pull pipeline and
/// the optimizer rules rewrite them in place.
#[derive(Debug, Clone)]
pub enum PlanNode {
    SeqScan {
        output_schema: Schema,
        table_oid: Oid,
        filter_predicate: Option<Arc<Expression>>,
    },
    IndexScan {
        output_schema: Schema,
        table_oid: Oid,
        index_oid: Oid,
        /// Point-lookup keys; empty means a full ordered scan.
        pred_keys: Vec<Value>,
        filter_predicate: Option<Arc<Expression>>,
    },
    /// Literal rows, used to feed DML statements.
    Values {
        output_schema: Schema,
        rows: Vec<Vec<Value>>,
    },
    Filter {
        output_schema: Schema,
        predicate: Arc<Expression>,
        child: Box<PlanNode>,
    },
    Limit {
        output_schema: Schema,
        limit: usize,
        child: Box<PlanNode>,
    },
    Insert {
        output_schema: Schema,
        table_oid: Oid,
        child: Box<PlanNode>,
    },
    Update {
        output_schema: Schema,
        table_oid: Oid,
        /// One expression per table column, evaluated over the old row.
        target_expressions: Vec<Arc<Expression>>,
        child: Box<PlanNode>,
    },
    Delete {
        output_schema: Schema,
        table_oid: Oid,
        child: Box<PlanNode>,
    },
    NestedLoopJoin {
        output_schema: Schema,
        join_type: JoinType,
        predicate: Option<Arc<Expression>>,
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },
    HashJoin {
        output_schema: Schema,
        join_type: JoinType,
        left_key_expressions: Vec<Arc<Expression>>,
        right_key_expressions: Vec<Arc<Expression>>,
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },
    NestedIndexJoin {
        output_schema: Schema,
        join_type: JoinType,
        /// Evaluated over the outer tuple to produce the inner lookup key.
        key_expression: Arc<Expression>,
        inner_table_oid: Oid,
        index_oid: Oid,
        child: Box<PlanNode>,
    },
    Aggregation {
        output_schema: Schema,
        group_by_expressions: Vec<Arc<Expression>>,
        aggregates: Vec<(AggregationType, Arc<Expression>)>,
        child: Box<PlanNode>,
    },
    Sort {
        output_schema: Schema,
        order_by: Vec<(OrderByDirection, Arc<Expression>)>,
        child: Box<PlanNode>,
    },
}

impl PlanNode {
    pub fn output_schema(&self) -> &Schema {
        match self {
            PlanNode::SeqScan { output_schema, .. }
            | PlanNode::IndexScan { output_schema, .. }
            | PlanNode::Values { output_schema, .. }
            | PlanNode::Filter { output_schema, .. }
            | PlanNode::Limit { output_schema, .. }
            | PlanNode::Insert { output_schema, .. }
            | PlanNode::Update { output_schema, .. }
            | PlanNode::Delete { output_schema, .. }
            | PlanNode::NestedLoopJoin { output_schema, .. }
            | PlanNode::HashJoin { output_schema, .. }
            | PlanNode::NestedIndexJoin { output_schema, .. }
            | PlanNode::Aggregation { output_schema, .. }
            | PlanNode::Sort { output_schema, .. } => output_schema,
        }
    }
}
