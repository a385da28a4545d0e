use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{QuarryError, RecordId, Result};
use crate::concurrency::{
    AbortReason, IsolationLevel, LockManager, Transaction, TransactionState,
};

/// Shared resources an executor tree runs against: the catalog, the owning
/// transaction, the lock manager, and the buffer pool.
pub struct ExecutorContext {
    catalog: Arc<Catalog>,
    transaction: Arc<Transaction>,
    lock_manager: Arc<dyn LockManager>,
    buffer_pool: Arc<dyn BufferPool>,
}

impl ExecutorContext {
    pub fn new(
        catalog: Arc<Catalog>,
        transaction: Arc<Transaction>,
        lock_manager: Arc<dyn LockManager>,
        buffer_pool: Arc<dyn BufferPool>,
    ) -> Self {
        Self {
            catalog,
            transaction,
            lock_manager,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn transaction(&self) -> &Arc<Transaction> {
        &self.transaction
    }

    pub fn lock_manager(&self) -> &Arc<dyn LockManager> {
        &self.lock_manager
    }

    pub fn buffer_pool(&self) -> &Arc<dyn BufferPool> {
        &self.buffer_pool
    }

    fn abort(&self) -> QuarryError {
        self.transaction.set_state(TransactionState::Aborted);
        QuarryError::TransactionAborted {
            txn_id: self.transaction.id(),
            reason: AbortReason::Deadlock,
        }
    }

    /// Takes an exclusive lock on the row, upgrading a shared lock the
    /// transaction already holds. A refusal aborts the transaction.
    pub fn lock_exclusive(&self, rid: RecordId) -> Result<()> {
        let granted = if self.transaction.is_shared_locked(rid) {
            self.lock_manager.lock_upgrade(&self.transaction, rid)
        } else {
            self.lock_manager.lock_exclusive(&self.transaction, rid)
        };
        if granted {
            Ok(())
        } else {
            Err(self.abort())
        }
    }

    /// Below REPEATABLE_READ, row locks are released as soon as the row has
    /// been processed instead of being held to commit.
    pub fn unlock_if_low_isolation(&self, rid: RecordId) -> Result<()> {
        if self.transaction.isolation_level() == IsolationLevel::RepeatableRead {
            return Ok(());
        }
        if self.lock_manager.unlock(&self.transaction, rid) {
            Ok(())
        } else {
            Err(self.abort())
        }
    }
}
