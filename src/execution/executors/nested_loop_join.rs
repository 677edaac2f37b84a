use std::sync::Arc;

use crate::common::{QuarryError, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::Executor;
use crate::execution::expression::{evaluates_to_true, Expression};
use crate::execution::plan::JoinType;
use crate::tuple::{Schema, Tuple, Value};

/// Tuple-at-a-time nested loop join. For every left tuple the right
/// child is reinitialized and probed in full; a LEFT join emits one
/// null-padded row for each left tuple that matched nothing.
pub struct NestedLoopJoinExecutor {
    output_schema: Schema,
    join_type: JoinType,
    predicate: Option<Arc<Expression>>,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    current_left: Option<Tuple>,
    left_matched: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        output_schema: Schema,
        join_type: JoinType,
        predicate: Option<Arc<Expression>>,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Result<Self> {
        if !matches!(join_type, JoinType::Inner | JoinType::Left) {
            return Err(QuarryError::UnsupportedJoinType(format!("{join_type:?}")));
        }
        Ok(Self {
            output_schema,
            join_type,
            predicate,
            left,
            right,
            current_left: None,
            left_matched: false,
        })
    }

    fn null_padded(&self, left_tuple: &Tuple) -> Tuple {
        let nulls = vec![Value::Null; self.right.output_schema().num_columns()];
        Tuple::join(left_tuple, &Tuple::new(nulls))
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.current_left = None;
        self.left_matched = false;
        self.left.init()?;
        self.right.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let rid = RecordId::new(INVALID_PAGE_ID, SlotId::new(0));

        loop {
            if self.current_left.is_none() {
                match self.left.next()? {
                    Some((tuple, _)) => {
                        self.current_left = Some(tuple);
                        self.left_matched = false;
                        self.right.init()?;
                    }
                    None => return Ok(None),
                }
            }
            let left_tuple = self.current_left.as_ref().unwrap();

            match self.right.next()? {
                Some((right_tuple, _)) => {
                    let admits = match &self.predicate {
                        Some(predicate) => evaluates_to_true(&predicate.evaluate_join(
                            left_tuple,
                            self.left.output_schema(),
                            &right_tuple,
                            self.right.output_schema(),
                        )),
                        None => true,
                    };
                    if admits {
                        self.left_matched = true;
                        return Ok(Some((Tuple::join(left_tuple, &right_tuple), rid)));
                    }
                }
                None => {
                    let emit_padded = self.join_type == JoinType::Left && !self.left_matched;
                    let padded = emit_padded.then(|| self.null_padded(left_tuple));
                    self.current_left = None;
                    if let Some(padded) = padded {
                        return Ok(Some((padded, rid)));
                    }
                }
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
