use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::common::{RecordId, TxnId};

use super::transaction::Transaction;

/// Row-level two-phase locking as the executors consume it. A refused
/// request (false) means the caller must abort its transaction.
pub trait LockManager: Send + Sync {
    fn lock_shared(&self, txn: &Transaction, rid: RecordId) -> bool;
    fn lock_exclusive(&self, txn: &Transaction, rid: RecordId) -> bool;
    /// Upgrades a held shared lock to exclusive.
    fn lock_upgrade(&self, txn: &Transaction, rid: RecordId) -> bool;
    fn unlock(&self, txn: &Transaction, rid: RecordId) -> bool;
}

#[derive(Default)]
struct RowLock {
    sharers: HashSet<TxnId>,
    exclusive: Option<TxnId>,
}

/// No-wait lock manager: a request that conflicts with a held lock is
/// refused immediately instead of blocking, which prevents deadlocks by
/// construction. Granted locks are mirrored into the transaction's lock
/// sets so executors can inspect them.
#[derive(Default)]
pub struct SimpleLockManager {
    table: Mutex<HashMap<RecordId, RowLock>>,
}

impl SimpleLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockManager for SimpleLockManager {
    fn lock_shared(&self, txn: &Transaction, rid: RecordId) -> bool {
        let mut table = self.table.lock();
        let row = table.entry(rid).or_default();

        match row.exclusive {
            Some(owner) if owner != txn.id() => false,
            Some(_) => true, // already exclusively ours
            None => {
                row.sharers.insert(txn.id());
                txn.add_shared_lock(rid);
                true
            }
        }
    }

    fn lock_exclusive(&self, txn: &Transaction, rid: RecordId) -> bool {
        let mut table = self.table.lock();
        let row = table.entry(rid).or_default();

        let contested = row.exclusive.map_or(false, |owner| owner != txn.id())
            || row.sharers.iter().any(|&id| id != txn.id());
        if contested {
            return false;
        }
        if row.sharers.contains(&txn.id()) {
            // still a fresh acquisition, not an upgrade; refuse so the
            // caller goes through lock_upgrade explicitly
            return false;
        }
        row.exclusive = Some(txn.id());
        txn.add_exclusive_lock(rid);
        true
    }

    fn lock_upgrade(&self, txn: &Transaction, rid: RecordId) -> bool {
        let mut table = self.table.lock();
        let row = match table.get_mut(&rid) {
            Some(row) => row,
            None => return false,
        };

        if !row.sharers.contains(&txn.id()) {
            return false;
        }
        if row.exclusive.is_some() || row.sharers.len() > 1 {
            return false;
        }
        row.sharers.remove(&txn.id());
        row.exclusive = Some(txn.id());
        txn.add_exclusive_lock(rid);
        true
    }

    fn unlock(&self, txn: &Transaction, rid: RecordId) -> bool {
        let mut table = self.table.lock();
        let row = match table.get_mut(&rid) {
            Some(row) => row,
            None => return false,
        };

        let mut held = row.sharers.remove(&txn.id());
        if row.exclusive == Some(txn.id()) {
            row.exclusive = None;
            held = true;
        }
        if row.sharers.is_empty() && row.exclusive.is_none() {
            table.remove(&rid);
        }
        if held {
            txn.remove_locks(rid);
        }
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PageId, SlotId};
    use crate::concurrency::IsolationLevel;

    fn rid(slot: u16) -> RecordId {
        RecordId::new(PageId::new(1), SlotId::new(slot))
    }

    #[test]
    fn test_exclusive_excludes_others() {
        let lm = SimpleLockManager::new();
        let t1 = Transaction::new(1, IsolationLevel::RepeatableRead);
        let t2 = Transaction::new(2, IsolationLevel::RepeatableRead);

        assert!(lm.lock_exclusive(&t1, rid(0)));
        assert!(!lm.lock_exclusive(&t2, rid(0)));
        assert!(!lm.lock_shared(&t2, rid(0)));

        assert!(lm.unlock(&t1, rid(0)));
        assert!(lm.lock_exclusive(&t2, rid(0)));
    }

    #[test]
    fn test_shared_locks_coexist() {
        let lm = SimpleLockManager::new();
        let t1 = Transaction::new(1, IsolationLevel::RepeatableRead);
        let t2 = Transaction::new(2, IsolationLevel::RepeatableRead);

        assert!(lm.lock_shared(&t1, rid(0)));
        assert!(lm.lock_shared(&t2, rid(0)));
        assert!(t1.is_shared_locked(rid(0)));

        // exclusive must wait for both sharers to go away
        assert!(!lm.lock_exclusive(&t1, rid(0)));
    }

    #[test]
    fn test_upgrade() {
        let lm = SimpleLockManager::new();
        let t1 = Transaction::new(1, IsolationLevel::RepeatableRead);
        let t2 = Transaction::new(2, IsolationLevel::RepeatableRead);

        assert!(lm.lock_shared(&t1, rid(0)));
        assert!(lm.lock_upgrade(&t1, rid(0)));
        assert!(t1.is_exclusive_locked(rid(0)));

        // upgrade with a second sharer present is refused
        assert!(lm.unlock(&t1, rid(0)));
        assert!(lm.lock_shared(&t1, rid(1)));
        assert!(lm.lock_shared(&t2, rid(1)));
        assert!(!lm.lock_upgrade(&t1, rid(1)));
    }

    #[test]
    fn test_unlock_without_lock() {
        let lm = SimpleLockManager::new();
        let t1 = Transaction::new(1, IsolationLevel::RepeatableRead);
        assert!(!lm.unlock(&t1, rid(0)));
    }
}
