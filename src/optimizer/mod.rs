//! Plan-rewriting optimizer rules.

pub mod nlj_as_hash_join;
pub mod seq_scan_as_index_scan;

pub use nlj_as_hash_join::optimize_nlj_as_hash_join;
pub use seq_scan_as_index_scan::optimize_seq_scan_as_index_scan;

use crate::execution::plan::PlanNode;

/// Rebuilds a plan with `f` applied to every child, giving rules a
/// uniform bottom-up traversal.
pub(crate) fn map_children(plan: PlanNode, f: &dyn Fn(PlanNode) -> PlanNode) -> PlanNode {
    match plan {
        leaf @ (PlanNode::SeqScan { .. } | PlanNode::IndexScan { .. } | PlanNode::Values { .. }) => {
            leaf
        }
        PlanNode::Filter {
            output_schema,
            predicate,
            child,
        } => PlanNode::Filter {
            output_schema,
            predicate,
            child: Box::new(f(*child)),
        },
        PlanNode::Limit {
            output_schema,
            limit,
            child,
        } => PlanNode::Limit {
            output_schema,
            limit,
            child: Box::new(f(*child)),
        },
        PlanNode::Insert {
            output_schema,
            table_oid,
            child,
        } => PlanNode::Insert {
            output_schema,
            table_oid,
            child: Box::new(f(*child)),
        },
        PlanNode::Update {
            output_schema,
            table_oid,
            target_expressions,
            child,
        } => PlanNode::Update {
            output_schema,
            table_oid,
            target_expressions,
            child: Box::new(f(*child)),
        },
        PlanNode::Delete {
            output_schema,
            table_oid,
            child,
        } => PlanNode::Delete {
            output_schema,
            table_oid,
            child: Box::new(f(*child)),
        },
        PlanNode::NestedLoopJoin {
            output_schema,
            join_type,
            predicate,
            left,
            right,
        } => PlanNode::NestedLoopJoin {
            output_schema,
            join_type,
            predicate,
            left: Box::new(f(*left)),
            right: Box::new(f(*right)),
        },
        PlanNode::HashJoin {
            output_schema,
            join_type,
            left_key_expressions,
            right_key_expressions,
            left,
            right,
        } => PlanNode::HashJoin {
            output_schema,
            join_type,
            left_key_expressions,
            right_key_expressions,
            left: Box::new(f(*left)),
            right: Box::new(f(*right)),
        },
        PlanNode::NestedIndexJoin {
            output_schema,
            join_type,
            key_expression,
            inner_table_oid,
            index_oid,
            child,
        } => PlanNode::NestedIndexJoin {
            output_schema,
            join_type,
            key_expression,
            inner_table_oid,
            index_oid,
            child: Box::new(f(*child)),
        },
        PlanNode::Aggregation {
            output_schema,
            group_by_expressions,
            aggregates,
            child,
        } => PlanNode::Aggregation {
            output_schema,
            group_by_expressions,
            aggregates,
            child: Box::new(f(*child)),
        },
        PlanNode::Sort {
            output_schema,
            order_by,
            child,
        } => PlanNode::Sort {
            output_schema,
            order_by,
            child: Box::new(f(*child)),
        },
    }
}
