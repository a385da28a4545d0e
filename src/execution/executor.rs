use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple};

/// Pull-based query operator. A parent drives its children by calling
/// `next` zero or more times per own `next`; `init` rewinds the operator
/// and must be called once before the first `next`.
///
/// Execution of one operator tree is single-threaded; concurrency exists
/// only between queries, which share the buffer pool and lock manager.
pub trait Executor {
    /// Prepares (or rewinds) the operator for iteration.
    fn init(&mut self) -> Result<()>;

    /// Produces the next row, or None at end of stream. The record id
    /// addresses the row's storage when it has one.
    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>>;

    /// Schema of the rows this operator emits.
    fn output_schema(&self) -> &Arc<Schema>;
}
