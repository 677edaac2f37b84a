use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::Executor;
use crate::execution::expression::Expression;
use crate::execution::plan::AggregationType;
use crate::tuple::{Schema, Tuple, Value};

/// One-pass hash aggregation keyed by the group-by expressions.
///
/// `init` drains the child and folds every tuple into per-group
/// accumulators; `next` walks the finished groups. Empty input with no
/// group-bys yields exactly one row of initial accumulator values
/// (counts 0, sum/min/max NULL). Output rows are the group keys followed
/// by the aggregate results.
pub struct AggregationExecutor {
    output_schema: Schema,
    group_by_expressions: Vec<Arc<Expression>>,
    aggregates: Vec<(AggregationType, Arc<Expression>)>,
    child: Box<dyn Executor>,
    groups: Vec<(Vec<Value>, Vec<Value>)>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(
        output_schema: Schema,
        group_by_expressions: Vec<Arc<Expression>>,
        aggregates: Vec<(AggregationType, Arc<Expression>)>,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            output_schema,
            group_by_expressions,
            aggregates,
            child,
            groups: Vec::new(),
            cursor: 0,
        }
    }

    fn initial_accumulators(&self) -> Vec<Value> {
        self.aggregates
            .iter()
            .map(|(kind, _)| match kind {
                AggregationType::CountStar | AggregationType::Count => Value::Integer(0),
                AggregationType::Sum | AggregationType::Min | AggregationType::Max => Value::Null,
            })
            .collect()
    }

    fn combine(&self, accumulators: &mut [Value], inputs: &[Value]) {
        for (i, (kind, _)) in self.aggregates.iter().enumerate() {
            let input = &inputs[i];
            match kind {
                AggregationType::CountStar => {
                    if let Value::Integer(n) = &accumulators[i] {
                        accumulators[i] = Value::Integer(n + 1);
                    }
                }
                AggregationType::Count => {
                    if !input.is_null() {
                        if let Value::Integer(n) = &accumulators[i] {
                            accumulators[i] = Value::Integer(n + 1);
                        }
                    }
                }
                AggregationType::Sum => {
                    if !input.is_null() {
                        accumulators[i] = match &accumulators[i] {
                            Value::Null => input.clone(),
                            acc => acc.checked_add(input).unwrap_or(Value::Null),
                        };
                    }
                }
                AggregationType::Min => {
                    if !input.is_null() {
                        let replace = match accumulators[i].compare(input) {
                            Some(ordering) => ordering == Ordering::Greater,
                            None => accumulators[i].is_null(),
                        };
                        if replace {
                            accumulators[i] = input.clone();
                        }
                    }
                }
                AggregationType::Max => {
                    if !input.is_null() {
                        let replace = match accumulators[i].compare(input) {
                            Some(ordering) => ordering == Ordering::Less,
                            None => accumulators[i].is_null(),
                        };
                        if replace {
                            accumulators[i] = input.clone();
                        }
                    }
                }
            }
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;

        let child_schema = self.child.output_schema().clone();
        let mut table: HashMap<Vec<Value>, Vec<Value>> = HashMap::new();
        let mut insertion_order: Vec<Vec<Value>> = Vec::new();

        while let Some((tuple, _)) = self.child.next()? {
            let key: Vec<Value> = self
                .group_by_expressions
                .iter()
                .map(|expr| expr.evaluate(&tuple, &child_schema))
                .collect();
            let inputs: Vec<Value> = self
                .aggregates
                .iter()
                .map(|(_, expr)| expr.evaluate(&tuple, &child_schema))
                .collect();

            if !table.contains_key(&key) {
                insertion_order.push(key.clone());
                table.insert(key.clone(), self.initial_accumulators());
            }
            let accumulators = table.get_mut(&key).unwrap();
            self.combine(accumulators, &inputs);
        }

        // A grand aggregate over empty input still produces one row.
        if self.group_by_expressions.is_empty() && table.is_empty() {
            insertion_order.push(Vec::new());
            table.insert(Vec::new(), self.initial_accumulators());
        }

        self.groups = insertion_order
            .into_iter()
            .map(|key| {
                let accumulators = table.remove(&key).expect("every key has accumulators");
                (key, accumulators)
            })
            .collect();
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        if self.cursor >= self.groups.len() {
            return Ok(None);
        }
        let (key, accumulators) = &self.groups[self.cursor];
        self.cursor += 1;

        let mut values = key.clone();
        values.extend(accumulators.iter().cloned());
        Ok(Some((
            Tuple::new(values),
            RecordId::new(INVALID_PAGE_ID, SlotId::new(0)),
        )))
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
