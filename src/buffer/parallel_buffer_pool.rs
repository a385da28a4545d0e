use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{PageId, QuarryError, Result};
use crate::storage::disk::DiskManager;

use super::{BufferPool, BufferPoolInstance, Frame};

/// A buffer pool sharded over `num_instances` independent instances. Pages
/// are assigned to shards by `page_id % num_instances`, so every
/// non-allocating operation dispatches to exactly one instance and shards
/// never contend on each other's latch.
pub struct ParallelBufferPool {
    instances: Vec<BufferPoolInstance>,
    /// Frames per instance
    pool_size: usize,
    /// Round-robin cursor for `new_page`
    start_index: Mutex<usize>,
}

impl ParallelBufferPool {
    pub fn new(num_instances: usize, pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        assert!(num_instances > 0, "a pool needs at least one instance");

        let instances = (0..num_instances)
            .map(|i| {
                BufferPoolInstance::sharded(
                    pool_size,
                    num_instances as u32,
                    i as u32,
                    Arc::clone(&disk_manager),
                )
            })
            .collect();

        Self {
            instances,
            pool_size,
            start_index: Mutex::new(0),
        }
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// The instance responsible for the given page.
    fn instance_for(&self, page_id: PageId) -> &BufferPoolInstance {
        &self.instances[page_id.as_usize() % self.instances.len()]
    }

    /// Returns the pin count of a resident page, or None if not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.instance_for(page_id).pin_count(page_id)
    }
}

impl BufferPool for ParallelBufferPool {
    /// Allocates a page from the first instance that has a frame available,
    /// starting at the round-robin cursor and bumping it past the shard that
    /// satisfied the request.
    fn new_page(&self) -> Result<(PageId, Arc<Frame>)> {
        let num = self.instances.len();
        let mut start = self.start_index.lock();

        for i in *start..*start + num {
            match self.instances[i % num].new_page() {
                Ok(result) => {
                    *start = (i + 1) % num;
                    return Ok(result);
                }
                Err(QuarryError::AllFramesPinned) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(QuarryError::AllFramesPinned)
    }

    fn fetch_page(&self, page_id: PageId) -> Result<Arc<Frame>> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> Result<bool> {
        self.instance_for(page_id).flush_page(page_id)
    }

    fn flush_all_pages(&self) -> Result<()> {
        for instance in &self.instances {
            instance.flush_all_pages()?;
        }
        Ok(())
    }

    fn delete_page(&self, page_id: PageId) -> Result<bool> {
        self.instance_for(page_id).delete_page(page_id)
    }

    /// Total frames across all instances.
    fn pool_size(&self) -> usize {
        self.instances.len() * self.pool_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_pool(num_instances: usize, pool_size: usize) -> (ParallelBufferPool, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        (
            ParallelBufferPool::new(num_instances, pool_size, dm),
            temp_file,
        )
    }

    #[test]
    fn test_total_pool_size() {
        let (pool, _temp) = create_pool(4, 5);
        assert_eq!(pool.pool_size(), 20);
    }

    #[test]
    fn test_new_page_round_robin() {
        let (pool, _temp) = create_pool(3, 2);

        // successive allocations come from successive shards
        let mut shards = Vec::new();
        for _ in 0..3 {
            let (pid, _frame) = pool.new_page().unwrap();
            shards.push(pid.as_u32() % 3);
            pool.unpin_page(pid, false);
        }
        assert_eq!(shards, vec![0, 1, 2]);
    }

    #[test]
    fn test_new_page_skips_full_instances() {
        let (pool, _temp) = create_pool(2, 1);

        // fill shard 0 with a pinned page
        let (p0, _f0) = pool.new_page().unwrap();
        assert_eq!(p0.as_u32() % 2, 0);

        // shard 1 still has room; both of the next allocations must land there
        let (p1, _f1) = pool.new_page().unwrap();
        assert_eq!(p1.as_u32() % 2, 1);
        pool.unpin_page(p1, false);

        let (p2, _f2) = pool.new_page().unwrap();
        assert_eq!(p2.as_u32() % 2, 1);
        pool.unpin_page(p2, false);
    }

    #[test]
    fn test_new_page_fails_when_every_instance_is_full() {
        let (pool, _temp) = create_pool(2, 1);

        let (_p0, _f0) = pool.new_page().unwrap();
        let (_p1, _f1) = pool.new_page().unwrap();

        assert!(matches!(pool.new_page(), Err(QuarryError::AllFramesPinned)));
    }

    #[test]
    fn test_operations_dispatch_to_owning_instance() {
        let (pool, _temp) = create_pool(3, 2);

        let (pid, frame) = pool.new_page().unwrap();
        {
            let mut data = frame.write_data();
            data[0] = 0x5A;
        }
        assert!(pool.unpin_page(pid, true));
        drop(frame);

        let frame = pool.fetch_page(pid).unwrap();
        assert_eq!(frame.read_data()[0], 0x5A);
        assert!(pool.unpin_page(pid, false));

        assert!(pool.flush_page(pid).unwrap());
        assert!(pool.delete_page(pid).unwrap());
        assert_eq!(pool.pin_count(pid), None);
    }
}
