use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::common::{QuarryError, RecordId, Result};
use crate::tuple::{Schema, Tuple};

use super::executor::Executor;
use super::executor_context::ExecutorContext;
use super::plan::InsertPlan;

/// Inserts rows into a table, either the plan's literal rows or everything
/// the child produces. Every inserted row is locked exclusively, mirrored
/// into the table's indexes, and produces no output.
pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    plan: InsertPlan,
    child: Option<Box<dyn Executor>>,
    table_info: Arc<TableInfo>,
    indexes: Vec<Arc<IndexInfo>>,
    raw_cursor: usize,
    output_schema: Arc<Schema>,
}

impl InsertExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: InsertPlan,
        child: Option<Box<dyn Executor>>,
    ) -> Result<Self> {
        debug_assert_eq!(plan.is_raw_insert(), child.is_none());
        let table_info = ctx
            .catalog()
            .get_table(plan.table_oid)
            .ok_or(QuarryError::TableNotFound(plan.table_oid))?;
        let indexes = ctx.catalog().get_table_indexes(&table_info.name);
        Ok(Self {
            ctx,
            plan,
            child,
            table_info,
            indexes,
            raw_cursor: 0,
            output_schema: Arc::new(Schema::new(Vec::new())),
        })
    }

    fn next_source_row(&mut self) -> Result<Option<Tuple>> {
        if let Some(raw_values) = &self.plan.raw_values {
            let row = match raw_values.get(self.raw_cursor) {
                Some(row) => row.clone(),
                None => return Ok(None),
            };
            self.raw_cursor += 1;
            return Ok(Some(Tuple::new(Arc::clone(&self.table_info.schema), row)));
        }

        let child = self.child.as_mut().expect("child-fed insert has a child");
        Ok(child.next()?.map(|(tuple, _)| tuple))
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> Result<()> {
        if let Some(child) = &mut self.child {
            child.init()?;
        }
        self.raw_cursor = 0;
        Ok(())
    }

    /// Consumes the entire source; produces no rows.
    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while let Some(tuple) = self.next_source_row()? {
            let rid = self.table_info.table.insert_tuple(&tuple)?;

            self.ctx.lock_exclusive(rid)?;

            for index_info in &self.indexes {
                let key = tuple
                    .project(index_info.index.key_attrs())
                    .ok_or(QuarryError::TupleEncoding)?;
                index_info.index.insert_entry(&key, rid)?;
            }

            self.ctx.unlock_if_low_isolation(rid)?;
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
