use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple};

use super::executor::Executor;
use super::plan::NestedLoopJoinPlan;

/// Joins by iterating the right child in full for every left row. The
/// right child is re-initialized each time the outer row advances.
pub struct NestedLoopJoinExecutor {
    plan: NestedLoopJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    left_row: Option<(Tuple, RecordId)>,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        plan: NestedLoopJoinPlan,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        Self {
            plan,
            left,
            right,
            left_row: None,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.left.init()?;
        self.right.init()?;
        self.left_row = self.left.next()?;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let (mut left_tuple, mut left_rid) = match self.left_row.clone() {
            Some(row) => row,
            None => return Ok(None),
        };

        loop {
            if let Some((right_tuple, _)) = self.right.next()? {
                let matches = match &self.plan.predicate {
                    None => true,
                    Some(predicate) => {
                        predicate.evaluate_join(&left_tuple, &right_tuple).is_true()
                    }
                };
                if matches {
                    let values = self
                        .plan
                        .output_exprs
                        .iter()
                        .map(|expr| expr.evaluate_join(&left_tuple, &right_tuple))
                        .collect();
                    let out = Tuple::new(Arc::clone(&self.plan.output_schema), values);
                    return Ok(Some((out, left_rid)));
                }
                continue;
            }

            // inner side exhausted: advance the outer row and rewind
            match self.left.next()? {
                Some(row) => {
                    left_tuple = row.0.clone();
                    left_rid = row.1;
                    self.left_row = Some(row);
                    self.right.init()?;
                }
                None => {
                    self.left_row = None;
                    return Ok(None);
                }
            }
        }
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.plan.output_schema
    }
}
