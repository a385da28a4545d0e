use std::collections::{HashMap, LinkedList};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::common::{FrameId, PageId, QuarryError, Result, PAGE_SIZE};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{BufferPool, Frame, LruReplacer, Replacer};

/// State protected by the instance-wide latch: which page lives in which
/// frame, and which frames have never held a page.
struct PoolState {
    /// Page table: maps resident page IDs to frame IDs
    page_table: HashMap<PageId, FrameId>,
    /// Frames that are not currently holding any page
    free_list: LinkedList<FrameId>,
}

/// One shard of the buffer pool. It owns a fixed array of frames, hands out
/// pinned frames for resident pages, and evicts unpinned pages through its
/// replacer when it runs out of room.
///
/// When the instance is part of a parallel pool of `num_instances` shards,
/// every page id it allocates satisfies
/// `page_id % num_instances == instance_index`.
pub struct BufferPoolInstance {
    /// Number of frames owned by this instance
    pool_size: usize,
    /// Total number of shards in the owning pool (1 when standalone)
    num_instances: u32,
    /// This shard's position among the instances
    instance_index: u32,
    /// Next page id to allocate; advances by `num_instances`
    next_page_id: AtomicU32,
    /// The frames; the vector itself never changes after construction
    frames: Vec<Arc<Frame>>,
    /// Instance-wide latch over the page table and free list
    latch: Mutex<PoolState>,
    /// Eviction policy over unpinned frames
    replacer: LruReplacer,
    /// Disk I/O channel
    disk_scheduler: DiskScheduler,
}

impl BufferPoolInstance {
    /// Creates a standalone buffer pool instance.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        Self::sharded(pool_size, 1, 0, disk_manager)
    }

    /// Creates one shard of a parallel buffer pool.
    pub fn sharded(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        assert!(num_instances > 0, "a pool needs at least one instance");
        assert!(
            instance_index < num_instances,
            "instance index must be below the instance count"
        );

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = LinkedList::new();
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(Frame::new(frame_id)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            num_instances,
            instance_index,
            next_page_id: AtomicU32::new(instance_index),
            frames,
            latch: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
            }),
            replacer: LruReplacer::new(pool_size),
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    pub fn instance_index(&self) -> u32 {
        self.instance_index
    }

    /// Returns the pin count of a resident page, or None if not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.latch.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&fid| self.frames[fid.as_usize()].pin_count())
    }

    /// Number of frames that have never held a page (or were freed).
    pub fn free_frame_count(&self) -> usize {
        self.latch.lock().free_list.len()
    }

    /// Number of unpinned resident frames eligible for eviction.
    pub fn evictable_count(&self) -> usize {
        self.replacer.size()
    }

    /// Allocates the next page id owned by this shard.
    fn allocate_page(&self) -> PageId {
        let id = self
            .next_page_id
            .fetch_add(self.num_instances, Ordering::SeqCst);
        debug_assert_eq!(id % self.num_instances, self.instance_index);
        PageId::new(id)
    }

    /// Picks a victim frame: free list first, then the replacer. A dirty
    /// victim is written back before its frame is reused. Must be called
    /// with the instance latch held so that nobody observes the frame
    /// between eviction and installation.
    fn acquire_victim(&self, state: &mut PoolState) -> Result<Option<FrameId>> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(Some(frame_id));
        }

        let frame_id = match self.replacer.victim() {
            Some(frame_id) => frame_id,
            None => return Ok(None),
        };
        let frame = &self.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            debug!("evicting dirty page {}, writing back", old_page_id);
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            self.disk_scheduler.schedule_write_sync(old_page_id, &data)?;
        }

        state.page_table.remove(&old_page_id);
        frame.reset();
        Ok(Some(frame_id))
    }
}

impl BufferPool for BufferPoolInstance {
    /// Allocates a fresh page, installs it in a frame with `pin_count == 1`,
    /// and writes the zero-filled page through to disk.
    fn new_page(&self) -> Result<(PageId, Arc<Frame>)> {
        let mut state = self.latch.lock();

        let frame_id = self
            .acquire_victim(&mut state)?
            .ok_or(QuarryError::AllFramesPinned)?;
        let frame = &self.frames[frame_id.as_usize()];

        let page_id = self.allocate_page();
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        let zeros = [0u8; PAGE_SIZE];
        self.disk_scheduler.schedule_write_sync(page_id, &zeros)?;

        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        Ok((page_id, Arc::clone(frame)))
    }

    /// Returns a pinned frame for the page, reading it from disk if it is
    /// not resident.
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<Frame>> {
        if !page_id.is_valid() {
            return Err(QuarryError::InvalidPageId(page_id));
        }

        let mut state = self.latch.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            frame.pin();
            self.replacer.pin(frame_id);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self
            .acquire_victim(&mut state)?
            .ok_or(QuarryError::PageNotResident(page_id))?;
        let frame = &self.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        self.disk_scheduler.schedule_read_sync(page_id, &mut data)?;

        frame.set_page_id(page_id);
        frame.copy_from(&data);
        frame.set_dirty(false);
        frame.pin();

        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        Ok(Arc::clone(frame))
    }

    /// Drops one pin on the page. Dirtiness is sticky: once a caller unpins
    /// with `is_dirty == true`, later clean unpins do not clear it. When the
    /// pin count reaches zero, the frame becomes evictable.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.latch.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let frame = &self.frames[frame_id.as_usize()];

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.pin_count() == 0 {
            return false;
        }
        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes the page to disk unconditionally and clears its dirty bit.
    ///
    /// The instance latch is released before the page latch is taken: a
    /// pinned page's latch may be held by a caller that is itself waiting
    /// on this instance, so nesting the two would deadlock. If the page is
    /// evicted in the window, eviction already wrote it out.
    fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame = {
            let state = self.latch.lock();
            match state.page_table.get(&page_id) {
                Some(&frame_id) => Arc::clone(&self.frames[frame_id.as_usize()]),
                None => return Ok(false),
            }
        };

        let data = frame.read_data();
        if frame.page_id() != page_id {
            return Ok(true);
        }
        self.disk_scheduler.schedule_write_sync(page_id, &data[..])?;
        frame.set_dirty(false);

        Ok(true)
    }

    /// Flushes every resident page.
    fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<PageId> = {
            let state = self.latch.lock();
            state.page_table.keys().copied().collect()
        };

        for page_id in resident {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Removes the page from the pool and returns its frame to the free
    /// list. Refuses (Ok(false)) while the page is pinned; a page that is
    /// not resident counts as already deleted.
    fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.latch.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(true),
        };
        let frame = &self.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        self.disk_scheduler.disk_manager().deallocate_page(page_id)?;
        Ok(true)
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}
