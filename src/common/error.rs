use thiserror::Error;

use crate::concurrency::AbortReason;

use super::types::{PageId, TxnId};

/// Database error types
#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page {0} is not resident and no frame could be freed")]
    PageNotResident(PageId),

    #[error("All frames are pinned, cannot allocate a new page")]
    AllFramesPinned,

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Hash directory cannot grow past its maximum global depth")]
    DirectoryOverflow,

    #[error("Page overflow: tuple size {tuple_size} exceeds available space {available}")]
    PageOverflow { tuple_size: usize, available: usize },

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("Tuple value does not fit its column type")]
    TupleEncoding,

    #[error("Table {0} not found")]
    TableNotFound(u32),

    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Index '{0}' already exists on table '{1}'")]
    IndexAlreadyExists(String, String),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Transaction {txn_id} aborted: {reason}")]
    TransactionAborted { txn_id: TxnId, reason: AbortReason },
}

impl QuarryError {
    /// Whether this error unwinds the executor tree because the owning
    /// transaction was aborted.
    pub fn is_transaction_abort(&self) -> bool {
        matches!(self, QuarryError::TransactionAborted { .. })
    }
}

pub type Result<T> = std::result::Result<T, QuarryError>;
