use std::sync::Arc;

use crate::common::{Oid, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::execution::expression::Expression;
use crate::tuple::{Schema, Tuple, Value};

/// One-shot executor implementing update as delete-then-insert: the old
/// version is tombstoned and its index entries removed, the new version
/// is appended (under a fresh record id) and indexed, and a single row
/// with the updated count is emitted.
pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    table_oid: Oid,
    target_expressions: Vec<Arc<Expression>>,
    child: Box<dyn Executor>,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        output_schema: Schema,
        table_oid: Oid,
        target_expressions: Vec<Arc<Expression>>,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            ctx,
            output_schema,
            table_oid,
            target_expressions,
            child,
            done: false,
        }
    }
}

impl Executor for UpdateExecutor {
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
        let child_schema = self.child.output_schema().clone();

        let mut updated = 0i32;
        while let Some((old_tuple, old_rid)) = self.child.next()? {
            let new_values: Vec<Value> = self
                .target_expressions
                .iter()
                .map(|expr| expr.evaluate(&old_tuple, &child_schema))
                .collect();
            let new_tuple = Tuple::new(new_values);

            // Remove the old version from every index, then tombstone it.
            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&old_tuple) {
                    index_info.index.remove(key)?;
                }
            }
            if !table.heap.set_deleted(old_rid, true)? {
                continue;
            }

            let new_rid = table.heap.insert_tuple(&new_tuple.to_bytes(&table.schema)?)?;
            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&new_tuple) {
                    index_info.index.insert(key, new_rid)?;
                }
            }
            updated += 1;
        }

        let count = Tuple::new(vec![Value::Integer(updated)]);
        Ok(Some((count, RecordId::new(INVALID_PAGE_ID, SlotId::new(0)))))
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
