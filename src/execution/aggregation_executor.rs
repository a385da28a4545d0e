use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::executor::Executor;
use super::plan::{AggregationPlan, AggregationType};

/// Group key: the evaluated group-by expressions of a row. Groupless
/// aggregation uses the empty key, collapsing everything into one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey(pub Vec<Value>);

/// In-memory hash table from group key to one accumulator per aggregate.
///
/// Accumulator identities: COUNT and SUM start at zero; MIN and MAX start
/// at Null, which any first real value replaces (standing in for plus and
/// minus infinity over any ordered type). COUNT advances on every input
/// row; SUM, MIN and MAX ignore null inputs.
pub struct AggregationHashTable {
    map: HashMap<AggregateKey, Vec<Value>>,
    agg_types: Vec<AggregationType>,
}

impl AggregationHashTable {
    pub fn new(agg_types: Vec<AggregationType>) -> Self {
        Self {
            map: HashMap::new(),
            agg_types,
        }
    }

    fn initial_values(&self) -> Vec<Value> {
        self.agg_types
            .iter()
            .map(|agg_type| match agg_type {
                AggregationType::Count | AggregationType::Sum => Value::Integer(0),
                AggregationType::Min | AggregationType::Max => Value::Null,
            })
            .collect()
    }

    /// Merges one row's input values into the key's accumulators.
    pub fn insert_combine(&mut self, key: AggregateKey, input: &[Value]) {
        let initial = self.initial_values();
        let accumulators = self.map.entry(key).or_insert(initial);

        for (i, agg_type) in self.agg_types.iter().enumerate() {
            let value = match input.get(i) {
                Some(value) => value,
                None => continue,
            };
            match agg_type {
                AggregationType::Count => {
                    if let Some(next) = accumulators[i].add(&Value::Integer(1)) {
                        accumulators[i] = next;
                    }
                }
                AggregationType::Sum => {
                    if value.is_null() {
                        continue;
                    }
                    if let Some(next) = accumulators[i].add(value) {
                        accumulators[i] = next;
                    }
                }
                AggregationType::Min => {
                    if value.is_null() {
                        continue;
                    }
                    let replace = match accumulators[i].compare(value) {
                        None => accumulators[i].is_null(),
                        Some(ordering) => ordering.is_gt(),
                    };
                    if replace {
                        accumulators[i] = value.clone();
                    }
                }
                AggregationType::Max => {
                    if value.is_null() {
                        continue;
                    }
                    let replace = match accumulators[i].compare(value) {
                        None => accumulators[i].is_null(),
                        Some(ordering) => ordering.is_lt(),
                    };
                    if replace {
                        accumulators[i] = value.clone();
                    }
                }
            }
        }
    }

    /// Drains the table into (key, accumulators) pairs. Order is
    /// unspecified.
    pub fn into_results(self) -> Vec<(AggregateKey, Vec<Value>)> {
        self.map.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Drains the child at init, grouping rows and folding them into
/// accumulators; then emits one row per group that passes the HAVING
/// filter.
pub struct AggregationExecutor {
    plan: AggregationPlan,
    child: Box<dyn Executor>,
    results: Vec<(AggregateKey, Vec<Value>)>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(plan: AggregationPlan, child: Box<dyn Executor>) -> Self {
        Self {
            plan,
            child,
            results: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;

        let mut table = AggregationHashTable::new(self.plan.agg_types.clone());
        while let Some((tuple, _)) = self.child.next()? {
            let key = AggregateKey(
                self.plan
                    .group_by_exprs
                    .iter()
                    .map(|expr| expr.evaluate(&tuple))
                    .collect(),
            );
            let input: Vec<Value> = self
                .plan
                .aggregate_exprs
                .iter()
                .map(|expr| expr.evaluate(&tuple))
                .collect();
            table.insert_combine(key, &input);
        }

        self.results = table.into_results();
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while self.cursor < self.results.len() {
            let (key, accumulators) = &self.results[self.cursor];
            self.cursor += 1;

            let passes = match &self.plan.having {
                None => true,
                Some(having) => having.evaluate_aggregate(&key.0, accumulators).is_true(),
            };
            if !passes {
                continue;
            }

            let values = self
                .plan
                .output_exprs
                .iter()
                .map(|expr| expr.evaluate_aggregate(&key.0, accumulators))
                .collect();
            let out = Tuple::new(Arc::clone(&self.plan.output_schema), values);
            return Ok(Some((out, RecordId::invalid())));
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.plan.output_schema
    }
}
