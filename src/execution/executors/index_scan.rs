use std::sync::Arc;

use crate::common::{Oid, QuarryError, RecordId, Result};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::execution::expression::{evaluates_to_true, Expression};
use crate::index::BPlusTreeIterator;
use crate::tuple::{Schema, Tuple, Value};

enum ScanMode {
    /// Point lookups, performed in predicate-key order.
    Point { keys: Vec<i64>, position: usize },
    /// Full in-order scan through the tree iterator.
    Ordered(BPlusTreeIterator),
}

/// Produces table tuples through a B+Tree index, either as a set of
/// point lookups (when the plan supplies predicate keys) or as a full
/// ordered scan.
pub struct IndexScanExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    table_oid: Oid,
    index_oid: Oid,
    pred_keys: Vec<Value>,
    filter_predicate: Option<Arc<Expression>>,
    mode: Option<ScanMode>,
}

impl IndexScanExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        output_schema: Schema,
        table_oid: Oid,
        index_oid: Oid,
        pred_keys: Vec<Value>,
        filter_predicate: Option<Arc<Expression>>,
    ) -> Self {
        Self {
            ctx,
            output_schema,
            table_oid,
            index_oid,
            pred_keys,
            filter_predicate,
            mode: None,
        }
    }

    /// Fetches a live tuple by rid, applying the residual filter.
    fn fetch(&self, rid: RecordId) -> Result<Option<Tuple>> {
        let table = self.ctx.catalog.get_table(self.table_oid)?;
        let Some((bytes, deleted)) = table.heap.get_tuple(rid)? else {
            return Ok(None);
        };
        if deleted {
            return Ok(None);
        }
        let tuple = Tuple::from_bytes(&self.output_schema, &bytes);
        if let Some(predicate) = &self.filter_predicate {
            if !evaluates_to_true(&predicate.evaluate(&tuple, &self.output_schema)) {
                return Ok(None);
            }
        }
        Ok(Some(tuple))
    }
}

impl Executor for IndexScanExecutor {
    fn init(&mut self) -> Result<()> {
        let index_info = self.ctx.catalog.get_index(self.index_oid)?;

        self.mode = Some(if self.pred_keys.is_empty() {
            ScanMode::Ordered(index_info.index.begin()?)
        } else {
            let keys = self
                .pred_keys
                .iter()
                .map(|value| {
                    value.as_i64().ok_or_else(|| {
                        QuarryError::Execution(format!("non-integer index key {value}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            ScanMode::Point { keys, position: 0 }
        });
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let index_info = self.ctx.catalog.get_index(self.index_oid)?;

        loop {
            let rid = match self.mode.as_mut().expect("init() not called") {
                ScanMode::Point { keys, position } => {
                    if *position >= keys.len() {
                        return Ok(None);
                    }
                    let key = keys[*position];
                    *position += 1;
                    match index_info.index.get_value(key)? {
                        Some(rid) => rid,
                        None => continue,
                    }
                }
                ScanMode::Ordered(iterator) => match iterator.next() {
                    Some(entry) => entry?.1,
                    None => return Ok(None),
                },
            };

            if let Some(tuple) = self.fetch(rid)? {
                return Ok(Some((tuple, rid)));
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
