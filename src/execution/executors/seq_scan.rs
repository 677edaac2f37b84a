use std::sync::Arc;

use crate::common::{Oid, RecordId, Result};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::execution::expression::{evaluates_to_true, Expression};
use crate::storage::table::TableIterator;
use crate::tuple::{Schema, Tuple};

/// Scans a table heap front to back, skipping tombstoned tuples and rows
/// the optional filter predicate rejects.
pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    table_oid: Oid,
    filter_predicate: Option<Arc<Expression>>,
    iterator: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        output_schema: Schema,
        table_oid: Oid,
        filter_predicate: Option<Arc<Expression>>,
    ) -> Self {
        Self {
            ctx,
            output_schema,
            table_oid,
            filter_predicate,
            iterator: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<()> {
        let table = self.ctx.catalog.get_table(self.table_oid)?;
        self.iterator = Some(table.heap.iter());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let iterator = self.iterator.as_mut().expect("init() not called");

        while let Some((rid, bytes, deleted)) = iterator.next()? {
            if deleted {
                continue;
            }
            let tuple = Tuple::from_bytes(&self.output_schema, &bytes);
            if let Some(predicate) = &self.filter_predicate {
                if !evaluates_to_true(&predicate.evaluate(&tuple, &self.output_schema)) {
                    continue;
                }
            }
            return Ok(Some((tuple, rid)));
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
