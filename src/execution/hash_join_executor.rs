use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::executor::Executor;
use super::plan::HashJoinPlan;

/// Join key wrapper so rows bucket by their key expression's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JoinKey(Value);

/// Equi-join that materializes the left child into a hash table at init and
/// then streams the right child, emitting one output row per matching left
/// row. A cursor over the current match vector lets a single right row
/// produce many outputs across successive `next` calls.
pub struct HashJoinExecutor {
    plan: HashJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    hash_map: HashMap<JoinKey, Vec<Vec<Value>>>,
    /// Left rows matching the current right row
    current_matches: Vec<Vec<Value>>,
    match_cursor: usize,
    current_right: Vec<Value>,
    current_right_rid: RecordId,
}

impl HashJoinExecutor {
    pub fn new(plan: HashJoinPlan, left: Box<dyn Executor>, right: Box<dyn Executor>) -> Self {
        Self {
            plan,
            left,
            right,
            hash_map: HashMap::new(),
            current_matches: Vec::new(),
            match_cursor: 0,
            current_right: Vec::new(),
            current_right_rid: RecordId::invalid(),
        }
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.left.init()?;

        self.hash_map.clear();
        while let Some((tuple, _)) = self.left.next()? {
            let key = JoinKey(self.plan.left_key_expr.evaluate(&tuple));
            self.hash_map
                .entry(key)
                .or_default()
                .push(tuple.values().to_vec());
        }

        self.right.init()?;
        self.current_matches.clear();
        self.match_cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        // advance the right child until a probing row hits the build side
        while self.match_cursor >= self.current_matches.len() {
            let (right_tuple, right_rid) = match self.right.next()? {
                Some(row) => row,
                None => return Ok(None),
            };
            let key = JoinKey(self.plan.right_key_expr.evaluate(&right_tuple));
            if let Some(matches) = self.hash_map.get(&key) {
                self.current_matches = matches.clone();
                self.match_cursor = 0;
                self.current_right = right_tuple.values().to_vec();
                self.current_right_rid = right_rid;
            }
        }

        let left_tuple = Tuple::new(
            Arc::clone(self.left.output_schema()),
            self.current_matches[self.match_cursor].clone(),
        );
        let right_tuple = Tuple::new(
            Arc::clone(self.right.output_schema()),
            self.current_right.clone(),
        );
        self.match_cursor += 1;

        let values = self
            .plan
            .output_exprs
            .iter()
            .map(|expr| expr.evaluate_join(&left_tuple, &right_tuple))
            .collect();
        let out = Tuple::new(Arc::clone(&self.plan.output_schema), values);
        Ok(Some((out, self.current_right_rid)))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.plan.output_schema
    }
}
