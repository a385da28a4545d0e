//! Quarry - the storage and execution core of a disk-oriented RDBMS
//!
//! The engine keeps data on persistent storage and caches hot pages in a
//! fixed-size buffer pool; a disk-backed extendible hash index and a set of
//! pull-based query operators run on top of it.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): disk I/O and page organization
//!   - `DiskManager` / `DiskScheduler`: page file access behind a worker thread
//!   - `SlottedPage` / `TablePage`: variable-length tuple storage, chained per table
//!   - `HashDirectoryPage` / `HashBucketPage`: persisted extendible hash pages
//!   - `TableHeap`: tuple-level table access over the page chain
//!
//! - **Buffer Pool** (`buffer`): memory management for pages
//!   - `BufferPoolInstance`: one shard of frames with pin/unpin/flush/delete
//!   - `ParallelBufferPool`: shards page ids across instances
//!   - `LruReplacer`: least-recently-used eviction policy
//!
//! - **Index** (`index`): `ExtendibleHashTable` over directory and bucket
//!   pages, plus the `HashIndex` wrapper tables declare in the catalog
//!
//! - **Catalog** (`catalog`): in-memory table and index metadata
//!
//! - **Concurrency** (`concurrency`): transactions and row-level locking
//!
//! - **Execution** (`execution`): `init`/`next` operators - scan, insert,
//!   delete, update, joins, aggregation, distinct
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quarry::buffer::{BufferPool, BufferPoolInstance};
//! use quarry::storage::disk::DiskManager;
//!
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let pool = BufferPoolInstance::new(100, disk_manager);
//!
//! let (page_id, frame) = pool.new_page().unwrap();
//! {
//!     let mut data = frame.write_data();
//!     data[0] = 42;
//! }
//! pool.unpin_page(page_id, true);
//! pool.flush_page(page_id).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod execution;
pub mod index;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{PageId, QuarryError, RecordId, Result, SlotId};
