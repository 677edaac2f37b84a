use crate::common::{RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::Executor;
use crate::tuple::{Schema, Tuple, Value};

/// Emits a fixed list of literal rows; the usual source below an Insert.
pub struct ValuesExecutor {
    output_schema: Schema,
    rows: Vec<Vec<Value>>,
    cursor: usize,
}

impl ValuesExecutor {
    pub fn new(output_schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            output_schema,
            rows,
            cursor: 0,
        }
    }
}

impl Executor for ValuesExecutor {
    fn init(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        if self.cursor >= self.rows.len() {
            return Ok(None);
        }
        let tuple = Tuple::new(self.rows[self.cursor].clone());
        self.cursor += 1;
        Ok(Some((tuple, RecordId::new(INVALID_PAGE_ID, SlotId::new(0)))))
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
