use std::sync::Arc;

use crate::catalog::TableInfo;
use crate::common::{QuarryError, RecordId, Result};
use crate::storage::TableIterator;
use crate::tuple::{Schema, Tuple};

use super::executor::Executor;
use super::executor_context::ExecutorContext;
use super::plan::SeqScanPlan;

/// Scans a table front to back, projecting each stored tuple through the
/// plan's output expressions and dropping rows the predicate rejects.
pub struct SeqScanExecutor {
    plan: SeqScanPlan,
    table_info: Arc<TableInfo>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(ctx: &ExecutorContext, plan: SeqScanPlan) -> Result<Self> {
        let table_info = ctx
            .catalog()
            .get_table(plan.table_oid)
            .ok_or(QuarryError::TableNotFound(plan.table_oid))?;
        Ok(Self {
            plan,
            table_info,
            iter: None,
        })
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<()> {
        self.iter = Some(self.table_info.table.iter());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let iter = self.iter.as_mut().expect("init() not called");

        loop {
            let (rid, tuple) = match iter.next()? {
                Some(row) => row,
                None => return Ok(None),
            };

            let values = self
                .plan
                .output_exprs
                .iter()
                .map(|expr| expr.evaluate(&tuple))
                .collect();
            let projected = Tuple::new(Arc::clone(&self.plan.output_schema), values);

            // the predicate sees the projected row, like every consumer
            if let Some(predicate) = &self.plan.predicate {
                if !predicate.evaluate(&projected).is_true() {
                    continue;
                }
            }
            return Ok(Some((projected, rid)));
        }
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.plan.output_schema
    }
}
