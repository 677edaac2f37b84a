use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::execution::executor::Executor;
use crate::execution::expression::{evaluates_to_true, Expression};
use crate::tuple::{Schema, Tuple};

/// Forwards child tuples that satisfy the predicate.
pub struct FilterExecutor {
    output_schema: Schema,
    predicate: Arc<Expression>,
    child: Box<dyn Executor>,
}

impl FilterExecutor {
    pub fn new(output_schema: Schema, predicate: Arc<Expression>, child: Box<dyn Executor>) -> Self {
        Self {
            output_schema,
            predicate,
            child,
        }
    }
}

impl Executor for FilterExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while let Some((tuple, rid)) = self.child.next()? {
            if evaluates_to_true(&self.predicate.evaluate(&tuple, self.child.output_schema())) {
                return Ok(Some((tuple, rid)));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
