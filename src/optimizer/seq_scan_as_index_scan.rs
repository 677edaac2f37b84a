use crate::catalog::Catalog;
use crate::execution::expression::{ComparisonOp, Expression, LogicOp};
use crate::execution::plan::PlanNode;
use crate::tuple::Value;

use super::map_children;

/// Rewrites a filtered sequential scan into an index point scan when the
/// table has a single-column index on column C and the predicate is an
/// OR-tree of `C = const` / `const = C` equalities. The extracted
/// constants (deduplicated, first occurrence wins) become the point-key
/// set and the residual filter is cleared, since the lookups already
/// enforce it. Applied bottom-up.
pub fn optimize_seq_scan_as_index_scan(plan: PlanNode, catalog: &Catalog) -> PlanNode {
    let plan = map_children(plan, &|child| {
        optimize_seq_scan_as_index_scan(child, catalog)
    });

    match plan {
        PlanNode::SeqScan {
            output_schema,
            table_oid,
            filter_predicate,
        } => {
            if let Some(predicate) = &filter_predicate {
                for index_info in catalog.table_indexes(table_oid) {
                    if !is_index_friendly(predicate, index_info.key_column) {
                        continue;
                    }
                    let mut constants = Vec::new();
                    collect_equality_constants(predicate, index_info.key_column, &mut constants);

                    let mut pred_keys: Vec<Value> = Vec::new();
                    for constant in constants {
                        if !pred_keys.contains(&constant) {
                            pred_keys.push(constant);
                        }
                    }
                    if !pred_keys.is_empty() {
                        return PlanNode::IndexScan {
                            output_schema,
                            table_oid,
                            index_oid: index_info.oid,
                            pred_keys,
                            filter_predicate: None,
                        };
                    }
                }
            }
            PlanNode::SeqScan {
                output_schema,
                table_oid,
                filter_predicate,
            }
        }
        other => other,
    }
}

/// Whether the predicate is an OR-tree of equality comparisons between
/// the indexed column and a constant.
fn is_index_friendly(expr: &Expression, key_column: usize) -> bool {
    match expr {
        Expression::Logic {
            op: LogicOp::Or,
            left,
            right,
        } => is_index_friendly(left, key_column) && is_index_friendly(right, key_column),
        Expression::Comparison {
            op: ComparisonOp::Equal,
            left,
            right,
        } => equality_constant(left, right, key_column).is_some(),
        _ => false,
    }
}

/// Collects the constants of every `column = const` / `const = column`
/// equality on the key column, in predicate order.
fn collect_equality_constants(expr: &Expression, key_column: usize, constants: &mut Vec<Value>) {
    match expr {
        Expression::Logic {
            op: LogicOp::Or,
            left,
            right,
        } => {
            collect_equality_constants(left, key_column, constants);
            collect_equality_constants(right, key_column, constants);
        }
        Expression::Comparison {
            op: ComparisonOp::Equal,
            left,
            right,
        } => {
            if let Some(value) = equality_constant(left, right, key_column) {
                constants.push(value);
            }
        }
        _ => {}
    }
}

/// The constant of a `column = const` (either orientation) comparison on
/// the key column.
fn equality_constant(left: &Expression, right: &Expression, key_column: usize) -> Option<Value> {
    match (left, right) {
        (Expression::ColumnRef { column_index, .. }, Expression::Constant(value))
            if *column_index == key_column =>
        {
            Some(value.clone())
        }
        (Expression::Constant(value), Expression::ColumnRef { column_index, .. })
            if *column_index == key_column =>
        {
            Some(value.clone())
        }
        _ => None,
    }
}
