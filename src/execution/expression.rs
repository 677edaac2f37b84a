use std::cmp::Ordering;
use std::sync::Arc;

use crate::tuple::{Schema, Tuple, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Expression tree evaluated against tuples.
///
/// Comparisons follow SQL three-valued logic: a null operand (or an
/// incomparable pair) yields `Null`, and predicates treat `Null` as not
/// satisfied. `ColumnRef::tuple_index` selects the side in a join
/// evaluation (0 = left, 1 = right) and is ignored in single-tuple
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    ColumnRef {
        tuple_index: usize,
        column_index: usize,
    },
    Constant(Value),
    Comparison {
        op: ComparisonOp,
        left: Arc<Expression>,
        right: Arc<Expression>,
    },
    Logic {
        op: LogicOp,
        left: Arc<Expression>,
        right: Arc<Expression>,
    },
}

impl Expression {
    pub fn column(tuple_index: usize, column_index: usize) -> Arc<Expression> {
        Arc::new(Expression::ColumnRef {
            tuple_index,
            column_index,
        })
    }

    pub fn constant(value: Value) -> Arc<Expression> {
        Arc::new(Expression::Constant(value))
    }

    pub fn comparison(
        op: ComparisonOp,
        left: Arc<Expression>,
        right: Arc<Expression>,
    ) -> Arc<Expression> {
        Arc::new(Expression::Comparison { op, left, right })
    }

    pub fn equal(left: Arc<Expression>, right: Arc<Expression>) -> Arc<Expression> {
        Self::comparison(ComparisonOp::Equal, left, right)
    }

    pub fn and(left: Arc<Expression>, right: Arc<Expression>) -> Arc<Expression> {
        Arc::new(Expression::Logic {
            op: LogicOp::And,
            left,
            right,
        })
    }

    pub fn or(left: Arc<Expression>, right: Arc<Expression>) -> Arc<Expression> {
        Arc::new(Expression::Logic {
            op: LogicOp::Or,
            left,
            right,
        })
    }

    /// Evaluates against one tuple.
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> Value {
        match self {
            Expression::ColumnRef { column_index, .. } => tuple.value(*column_index).clone(),
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => compare_values(
                *op,
                &left.evaluate(tuple, schema),
                &right.evaluate(tuple, schema),
            ),
            Expression::Logic { op, left, right } => logic_values(
                *op,
                &left.evaluate(tuple, schema),
                &right.evaluate(tuple, schema),
            ),
        }
    }

    /// Evaluates against a pair of join input tuples; column references
    /// pick their side by `tuple_index`.
    pub fn evaluate_join(
        &self,
        left_tuple: &Tuple,
        left_schema: &Schema,
        right_tuple: &Tuple,
        right_schema: &Schema,
    ) -> Value {
        match self {
            Expression::ColumnRef {
                tuple_index,
                column_index,
            } => {
                if *tuple_index == 0 {
                    left_tuple.value(*column_index).clone()
                } else {
                    right_tuple.value(*column_index).clone()
                }
            }
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => compare_values(
                *op,
                &left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema),
                &right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema),
            ),
            Expression::Logic { op, left, right } => logic_values(
                *op,
                &left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema),
                &right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema),
            ),
        }
    }
}

/// Whether a predicate result admits the row; `Null` does not.
pub fn evaluates_to_true(value: &Value) -> bool {
    matches!(value, Value::Boolean(true))
}

fn compare_values(op: ComparisonOp, left: &Value, right: &Value) -> Value {
    let Some(ordering) = left.compare(right) else {
        return Value::Null;
    };
    let result = match op {
        ComparisonOp::Equal => ordering == Ordering::Equal,
        ComparisonOp::NotEqual => ordering != Ordering::Equal,
        ComparisonOp::LessThan => ordering == Ordering::Less,
        ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
        ComparisonOp::GreaterThan => ordering == Ordering::Greater,
        ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
    };
    Value::Boolean(result)
}

fn logic_values(op: LogicOp, left: &Value, right: &Value) -> Value {
    let as_bool = |v: &Value| match v {
        Value::Boolean(b) => Some(*b),
        _ => None,
    };
    match op {
        LogicOp::And => match (as_bool(left), as_bool(right)) {
            (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
            (Some(true), Some(true)) => Value::Boolean(true),
            _ => Value::Null,
        },
        LogicOp::Or => match (as_bool(left), as_bool(right)) {
            (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
            (Some(false), Some(false)) => Value::Boolean(false),
            _ => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Column, DataType};

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("a", DataType::Integer),
            Column::new("b", DataType::Integer),
        ])
    }

    #[test]
    fn test_comparison_with_nulls() {
        let schema = schema();
        let tuple = Tuple::new(vec![Value::Integer(1), Value::Null]);

        let eq = Expression::equal(Expression::column(0, 0), Expression::constant(Value::Integer(1)));
        assert_eq!(eq.evaluate(&tuple, &schema), Value::Boolean(true));

        let against_null =
            Expression::equal(Expression::column(0, 1), Expression::constant(Value::Integer(1)));
        assert_eq!(against_null.evaluate(&tuple, &schema), Value::Null);
        assert!(!evaluates_to_true(&against_null.evaluate(&tuple, &schema)));
    }

    #[test]
    fn test_three_valued_logic() {
        let schema = schema();
        let tuple = Tuple::new(vec![Value::Integer(1), Value::Null]);

        let is_null = Expression::equal(Expression::column(0, 1), Expression::constant(Value::Integer(9)));
        let is_true = Expression::equal(Expression::column(0, 0), Expression::constant(Value::Integer(1)));

        let or = Expression::or(is_null.clone(), is_true.clone());
        assert_eq!(or.evaluate(&tuple, &schema), Value::Boolean(true));

        let and = Expression::and(is_null, is_true);
        assert_eq!(and.evaluate(&tuple, &schema), Value::Null);
    }

    #[test]
    fn test_evaluate_join_sides() {
        let left_schema = Schema::new(vec![Column::new("l", DataType::Integer)]);
        let right_schema = Schema::new(vec![Column::new("r", DataType::Integer)]);
        let left = Tuple::new(vec![Value::Integer(3)]);
        let right = Tuple::new(vec![Value::Integer(3)]);

        let predicate = Expression::equal(Expression::column(0, 0), Expression::column(1, 0));
        assert_eq!(
            predicate.evaluate_join(&left, &left_schema, &right, &right_schema),
            Value::Boolean(true)
        );

        let mismatched = Tuple::new(vec![Value::Integer(4)]);
        assert_eq!(
            predicate.evaluate_join(&left, &left_schema, &mismatched, &right_schema),
            Value::Boolean(false)
        );
    }
}
