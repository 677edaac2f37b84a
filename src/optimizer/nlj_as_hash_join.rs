use std::sync::Arc;

use crate::execution::expression::{ComparisonOp, Expression, LogicOp};
use crate::execution::plan::PlanNode;

use super::map_children;

/// Rewrites nested loop joins whose predicate is a conjunction of
/// cross-side column equalities into hash joins. The extracted key lists
/// are normalized so that the expression built from the left input (tuple
/// index 0) always lands in the left list. Applied bottom-up.
pub fn optimize_nlj_as_hash_join(plan: PlanNode) -> PlanNode {
    let plan = map_children(plan, &optimize_nlj_as_hash_join);

    match plan {
        PlanNode::NestedLoopJoin {
            output_schema,
            join_type,
            predicate,
            left,
            right,
        } => {
            if let Some(pred) = &predicate {
                let mut left_keys = Vec::new();
                let mut right_keys = Vec::new();
                if extract_equi_conditions(pred, &mut left_keys, &mut right_keys)
                    && !left_keys.is_empty()
                {
                    return PlanNode::HashJoin {
                        output_schema,
                        join_type,
                        left_key_expressions: left_keys,
                        right_key_expressions: right_keys,
                        left,
                        right,
                    };
                }
            }
            PlanNode::NestedLoopJoin {
                output_schema,
                join_type,
                predicate,
                left,
                right,
            }
        }
        other => other,
    }
}

/// Tears an AND-tree of equality comparisons into per-side key lists.
/// Returns false as soon as any conjunct is not a cross-side column
/// equality, leaving the rewrite off.
fn extract_equi_conditions(
    expr: &Expression,
    left_keys: &mut Vec<Arc<Expression>>,
    right_keys: &mut Vec<Arc<Expression>>,
) -> bool {
    match expr {
        Expression::Logic {
            op: LogicOp::And,
            left,
            right,
        } => {
            extract_equi_conditions(left, left_keys, right_keys)
                && extract_equi_conditions(right, left_keys, right_keys)
        }
        Expression::Comparison {
            op: ComparisonOp::Equal,
            left,
            right,
        } => {
            let (
                Expression::ColumnRef {
                    tuple_index: left_side,
                    column_index: left_column,
                },
                Expression::ColumnRef {
                    tuple_index: right_side,
                    column_index: right_column,
                },
            ) = (&**left, &**right)
            else {
                return false;
            };

            match (left_side, right_side) {
                (0, 1) => {
                    left_keys.push(Expression::column(0, *left_column));
                    right_keys.push(Expression::column(0, *right_column));
                    true
                }
                (1, 0) => {
                    left_keys.push(Expression::column(0, *right_column));
                    right_keys.push(Expression::column(0, *left_column));
                    true
                }
                _ => false,
            }
        }
        _ => false,
    }
}
