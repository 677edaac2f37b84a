use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{QuarryError, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::Executor;
use crate::execution::expression::Expression;
use crate::execution::plan::JoinType;
use crate::tuple::{Schema, Tuple, Value};

/// Hash join over conjunctive equi-keys. `init` drains the right child
/// into a hash table keyed by the right key expressions; `next` probes
/// it with each left tuple's keys. A LEFT join emits one null-padded row
/// per unmatched left tuple.
pub struct HashJoinExecutor {
    output_schema: Schema,
    join_type: JoinType,
    left_key_expressions: Vec<Arc<Expression>>,
    right_key_expressions: Vec<Arc<Expression>>,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    hash_table: HashMap<Vec<Value>, Vec<Tuple>>,
    current_left: Option<Tuple>,
    current_matches: Vec<Tuple>,
    match_index: usize,
    left_matched: bool,
}

impl HashJoinExecutor {
    pub fn new(
        output_schema: Schema,
        join_type: JoinType,
        left_key_expressions: Vec<Arc<Expression>>,
        right_key_expressions: Vec<Arc<Expression>>,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Result<Self> {
        if !matches!(join_type, JoinType::Inner | JoinType::Left) {
            return Err(QuarryError::UnsupportedJoinType(format!("{join_type:?}")));
        }
        Ok(Self {
            output_schema,
            join_type,
            left_key_expressions,
            right_key_expressions,
            left,
            right,
            hash_table: HashMap::new(),
            current_left: None,
            current_matches: Vec::new(),
            match_index: 0,
            left_matched: false,
        })
    }

    fn key_of(tuple: &Tuple, schema: &Schema, expressions: &[Arc<Expression>]) -> Vec<Value> {
        expressions
            .iter()
            .map(|expr| expr.evaluate(tuple, schema))
            .collect()
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.left.init()?;
        self.right.init()?;

        // Build phase over the right child.
        self.hash_table.clear();
        while let Some((tuple, _)) = self.right.next()? {
            let key = Self::key_of(&tuple, self.right.output_schema(), &self.right_key_expressions);
            self.hash_table.entry(key).or_default().push(tuple);
        }

        self.current_left = None;
        self.current_matches = Vec::new();
        self.match_index = 0;
        self.left_matched = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let rid = RecordId::new(INVALID_PAGE_ID, SlotId::new(0));

        loop {
            // Emit pending matches for the current left tuple.
            if let Some(left_tuple) = &self.current_left {
                if self.match_index < self.current_matches.len() {
                    let right_tuple = &self.current_matches[self.match_index];
                    self.match_index += 1;
                    self.left_matched = true;
                    return Ok(Some((Tuple::join(left_tuple, right_tuple), rid)));
                }
                if self.join_type == JoinType::Left && !self.left_matched {
                    let nulls = vec![Value::Null; self.right.output_schema().num_columns()];
                    let padded = Tuple::join(left_tuple, &Tuple::new(nulls));
                    self.current_left = None;
                    return Ok(Some((padded, rid)));
                }
                self.current_left = None;
            }

            // Probe phase: advance the left child.
            match self.left.next()? {
                Some((tuple, _)) => {
                    let key =
                        Self::key_of(&tuple, self.left.output_schema(), &self.left_key_expressions);
                    self.current_matches = self.hash_table.get(&key).cloned().unwrap_or_default();
                    self.match_index = 0;
                    self.left_matched = false;
                    self.current_left = Some(tuple);
                }
                None => return Ok(None),
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
