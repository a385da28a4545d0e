use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::common::{QuarryError, RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::executor::Executor;
use super::executor_context::ExecutorContext;
use super::plan::{UpdatePlan, UpdateType};

/// Rewrites every row the child produces by applying the plan's per-column
/// actions, keeping the table's indexes in sync.
pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    plan: UpdatePlan,
    child: Box<dyn Executor>,
    table_info: Arc<TableInfo>,
    indexes: Vec<Arc<IndexInfo>>,
    output_schema: Arc<Schema>,
}

impl UpdateExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: UpdatePlan,
        child: Box<dyn Executor>,
    ) -> Result<Self> {
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
            output_schema: Arc::new(Schema::new(Vec::new())),
        })
    }

    /// Applies the update actions to one source row.
    fn generate_updated_tuple(&self, src: &Tuple) -> Tuple {
        let values = src
            .values()
            .iter()
            .enumerate()
            .map(|(idx, value)| match self.plan.update_attrs.get(&idx) {
                None => value.clone(),
                Some(info) => match info.update_type {
                    UpdateType::Set => Value::Integer(info.value),
                    UpdateType::Add => value
                        .add(&Value::Integer(info.value))
                        .unwrap_or(Value::Null),
                },
            })
            .collect();
        Tuple::new(Arc::clone(&self.table_info.schema), values)
    }
}

impl Executor for UpdateExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()
    }

    /// Consumes the entire child; produces no rows.
    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while let Some((tuple, rid)) = self.child.next()? {
            self.ctx.lock_exclusive(rid)?;

            let new_tuple = self.generate_updated_tuple(&tuple);
            if !self.table_info.table.update_tuple(&new_tuple, rid)? {
                return Ok(None);
            }

            for index_info in &self.indexes {
                let old_key = tuple
                    .project(index_info.index.key_attrs())
                    .ok_or(QuarryError::TupleEncoding)?;
                let new_key = new_tuple
                    .project(index_info.index.key_attrs())
                    .ok_or(QuarryError::TupleEncoding)?;
                index_info.index.delete_entry(&old_key, rid)?;
                index_info.index.insert_entry(&new_key, rid)?;
            }

            self.ctx.unlock_if_low_isolation(rid)?;
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
