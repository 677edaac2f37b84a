use std::sync::Arc;

use crate::common::{Oid, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::tuple::{Schema, Tuple, Value};

/// One-shot executor: tombstones every child tuple in the table heap,
/// removes its entries from all indexes, and emits a single row with the
/// deleted count.
pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    table_oid: Oid,
    child: Box<dyn Executor>,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        output_schema: Schema,
        table_oid: Oid,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            ctx,
            output_schema,
            table_oid,
            child,
            done: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> Result<()> {
        self.done = false;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let table = self.ctx.catalog.get_table(self.table_oid)?;
        let indexes = self.ctx.catalog.table_indexes(self.table_oid);

        let mut deleted = 0i32;
        while let Some((tuple, rid)) = self.child.next()? {
            if !table.heap.set_deleted(rid, true)? {
                continue;
            }
            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&tuple) {
                    index_info.index.remove(key)?;
                }
            }
            deleted += 1;
        }

        let count = Tuple::new(vec![Value::Integer(deleted)]);
        Ok(Some((count, RecordId::new(INVALID_PAGE_ID, SlotId::new(0)))))
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
