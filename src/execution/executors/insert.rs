use std::sync::Arc;

use crate::common::{Oid, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::tuple::{Schema, Tuple, Value};

/// One-shot executor: drains the child, appends every tuple to the table
/// heap and to each of the table's indexes, and emits a single row with
/// the inserted count.
pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    table_oid: Oid,
    child: Box<dyn Executor>,
    done: bool,
}

impl InsertExecutor {
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

impl Executor for InsertExecutor {
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

        let mut inserted = 0i32;
        while let Some((tuple, _)) = self.child.next()? {
            let rid = table.heap.insert_tuple(&tuple.to_bytes(&table.schema)?)?;
            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&tuple) {
                    index_info.index.insert(key, rid)?;
                }
            }
            inserted += 1;
        }

        let count = Tuple::new(vec![Value::Integer(inserted)]);
        Ok(Some((count, RecordId::new(INVALID_PAGE_ID, SlotId::new(0)))))
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
