use std::sync::Arc;

use crate::common::{Oid, QuarryError, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::execution::expression::Expression;
use crate::execution::plan::JoinType;
use crate::tuple::{Schema, Tuple, Value};

/// Index nested loop join: each outer tuple drives a point lookup
/// against the inner table's unique index. A LEFT join emits one
/// null-padded row per outer tuple without a live match.
pub struct NestedIndexJoinExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    join_type: JoinType,
    key_expression: Arc<Expression>,
    inner_table_oid: Oid,
    index_oid: Oid,
    child: Box<dyn Executor>,
}

impl NestedIndexJoinExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        output_schema: Schema,
        join_type: JoinType,
        key_expression: Arc<Expression>,
        inner_table_oid: Oid,
        index_oid: Oid,
        child: Box<dyn Executor>,
    ) -> Result<Self> {
        if !matches!(join_type, JoinType::Inner | JoinType::Left) {
            return Err(QuarryError::UnsupportedJoinType(format!("{join_type:?}")));
        }
        Ok(Self {
            ctx,
            output_schema,
            join_type,
            key_expression,
            inner_table_oid,
            index_oid,
            child,
        })
    }

    /// The live inner tuple matching the outer key, if any.
    fn probe(&self, outer: &Tuple) -> Result<Option<Tuple>> {
        let Some(key) = self
            .key_expression
            .evaluate(outer, self.child.output_schema())
            .as_i64()
        else {
            return Ok(None);
        };

        let index_info = self.ctx.catalog.get_index(self.index_oid)?;
        let Some(rid) = index_info.index.get_value(key)? else {
            return Ok(None);
        };

        let table = self.ctx.catalog.get_table(self.inner_table_oid)?;
        let Some((bytes, deleted)) = table.heap.get_tuple(rid)? else {
            return Ok(None);
        };
        if deleted {
            return Ok(None);
        }
        Ok(Some(Tuple::from_bytes(&table.schema, &bytes)))
    }
}

impl Executor for NestedIndexJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let rid = RecordId::new(INVALID_PAGE_ID, SlotId::new(0));

        while let Some((outer, _)) = self.child.next()? {
            if let Some(inner) = self.probe(&outer)? {
                return Ok(Some((Tuple::join(&outer, &inner), rid)));
            }
            if self.join_type == JoinType::Left {
                let inner_width = self.output_schema.num_columns()
                    - self.child.output_schema().num_columns();
                let nulls = vec![Value::Null; inner_width];
                return Ok(Some((Tuple::join(&outer, &Tuple::new(nulls)), rid)));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
