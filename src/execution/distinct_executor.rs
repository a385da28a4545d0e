use std::collections::HashSet;
use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::executor::Executor;

/// Drops rows whose full value vector was already emitted. The schema is
/// the child's schema unchanged.
pub struct DistinctExecutor {
    child: Box<dyn Executor>,
    seen: HashSet<Vec<Value>>,
}

impl DistinctExecutor {
    pub fn new(child: Box<dyn Executor>) -> Self {
        Self {
            child,
            seen: HashSet::new(),
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.seen.clear();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while let Some((tuple, rid)) = self.child.next()? {
            if self.seen.insert(tuple.values().to_vec()) {
                return Ok(Some((tuple, rid)));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        self.child.output_schema()
    }
}
