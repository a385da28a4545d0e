mod buffer_pool_instance;
mod frame;
mod parallel_buffer_pool;
mod replacer;

use std::sync::Arc;

use crate::common::{PageId, Result};

pub use buffer_pool_instance::*;
pub use frame::*;
pub use parallel_buffer_pool::*;
pub use replacer::*;

/// Common surface of a buffer pool: the hash index and the table heap only
/// pin and unpin pages through this trait and work the same over a single
/// instance or a sharded pool.
pub trait BufferPool: Send + Sync {
    /// Allocates a fresh zero-filled page and returns it pinned once.
    /// Fails when every frame is pinned.
    fn new_page(&self) -> Result<(PageId, Arc<Frame>)>;

    /// Returns the page's frame with one additional pin, loading the page
    /// from disk if needed. Fails when the page is not resident and every
    /// frame is pinned.
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<Frame>>;

    /// Drops one pin, ORing `is_dirty` into the frame's dirty bit. Returns
    /// false if the page is not resident or was not pinned.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;

    /// Writes the page to disk unconditionally and clears its dirty bit.
    /// Returns false if the page is not resident.
    fn flush_page(&self, page_id: PageId) -> Result<bool>;

    /// Flushes every resident page.
    fn flush_all_pages(&self) -> Result<()>;

    /// Removes an unpinned page from the pool and deallocates it on disk.
    /// Returns false while the page is pinned; a page that is not resident
    /// counts as already deleted.
    fn delete_page(&self, page_id: PageId) -> Result<bool>;

    /// Total number of frames.
    fn pool_size(&self) -> usize;
}
