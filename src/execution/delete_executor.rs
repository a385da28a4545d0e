use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::common::{QuarryError, RecordId, Result};
use crate::concurrency::{IndexWriteRecord, WriteType};
use crate::tuple::{Schema, Tuple};

use super::executor::Executor;
use super::executor_context::ExecutorContext;
use super::plan::DeletePlan;

/// Deletes every row the child produces. The child is expected to emit
/// rows over the table's schema (a plain scan) so index keys can be
/// derived from them.
pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    plan: DeletePlan,
    child: Box<dyn Executor>,
    table_info: Arc<TableInfo>,
    indexes: Vec<Arc<IndexInfo>>,
    output_schema: Arc<Schema>,
}

impl DeleteExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: DeletePlan,
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
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()
    }

    /// Consumes the entire child; produces no rows.
    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while let Some((tuple, rid)) = self.child.next()? {
            self.ctx.lock_exclusive(rid)?;

            if !self.table_info.table.mark_delete(rid)? {
                return Ok(None);
            }

            for index_info in &self.indexes {
                let key = tuple
                    .project(index_info.index.key_attrs())
                    .ok_or(QuarryError::TupleEncoding)?;
                index_info.index.delete_entry(&key, rid)?;
                self.ctx.transaction().append_index_write(IndexWriteRecord {
                    rid,
                    table_oid: self.plan.table_oid,
                    write_type: WriteType::Delete,
                    tuple: tuple.clone(),
                    index_oid: index_info.index_oid,
                });
            }

            self.ctx.unlock_if_low_isolation(rid)?;
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
