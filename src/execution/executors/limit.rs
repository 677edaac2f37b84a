use crate::common::{RecordId, Result};
use crate::execution::executor::Executor;
use crate::tuple::{Schema, Tuple};

/// Forwards the first `limit` child tuples, then stops.
pub struct LimitExecutor {
    output_schema: Schema,
    limit: usize,
    emitted: usize,
    child: Box<dyn Executor>,
}

impl LimitExecutor {
    pub fn new(output_schema: Schema, limit: usize, child: Box<dyn Executor>) -> Self {
        Self {
            output_schema,
            limit,
            emitted: 0,
            child,
        }
    }
}

impl Executor for LimitExecutor {
    fn init(&mut self) -> Result<()> {
        self.emitted = 0;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        if self.emitted >= self.limit {
            return Ok(None);
        }
        match self.child.next()? {
            Some(item) => {
                self.emitted += 1;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
