use parking_lot::Mutex;

use crate::common::FrameId;

/// Victim-selection policy over unpinned frames. The buffer pool hands a
/// frame to the replacer when its pin count drops to zero and takes it back
/// when the frame is pinned again or evicted.
pub trait Replacer: Send + Sync {
    /// Removes and returns the frame that should be evicted next,
    /// or None if no frame is evictable.
    fn victim(&self) -> Option<FrameId>;

    /// Removes the frame from the replacer because it is in use again.
    /// A frame that is not present is ignored.
    fn pin(&self, frame_id: FrameId);

    /// Adds the frame as the most-recently-used candidate. A frame that is
    /// already present, or an insert past capacity, is ignored.
    fn unpin(&self, frame_id: FrameId);

    /// Number of evictable frames currently tracked.
    fn size(&self) -> usize;
}

/// Doubly-linked LRU list over dense frame ids. Frame ids index the `prev`/
/// `next` node arrays directly, so every operation is O(1).
struct LruList {
    /// Most-recently-used end; new entries are linked here
    head: Option<usize>,
    /// Least-recently-used end; victims are unlinked here
    tail: Option<usize>,
    prev: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
    in_list: Vec<bool>,
    size: usize,
}

impl LruList {
    fn new(capacity: usize) -> Self {
        Self {
            head: None,
            tail: None,
            prev: vec![None; capacity],
            next: vec![None; capacity],
            in_list: vec![false; capacity],
            size: 0,
        }
    }

    fn push_front(&mut self, idx: usize) {
        self.prev[idx] = None;
        self.next[idx] = self.head;
        match self.head {
            Some(old) => self.prev[old] = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.in_list[idx] = true;
        self.size += 1;
    }

    fn unlink(&mut self, idx: usize) {
        match self.prev[idx] {
            Some(p) => self.next[p] = self.next[idx],
            None => self.head = self.next[idx],
        }
        match self.next[idx] {
            Some(n) => self.prev[n] = self.prev[idx],
            None => self.tail = self.prev[idx],
        }
        self.prev[idx] = None;
        self.next[idx] = None;
        self.in_list[idx] = false;
        self.size -= 1;
    }

    fn pop_back(&mut self) -> Option<usize> {
        let idx = self.tail?;
        self.unlink(idx);
        Some(idx)
    }
}

/// Least-recently-used replacement policy. The victim is the frame whose
/// most recent unpin happened longest ago.
pub struct LruReplacer {
    capacity: usize,
    list: Mutex<LruList>,
}

impl LruReplacer {
    /// Creates an LRU replacer able to track up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            list: Mutex::new(LruList::new(capacity)),
        }
    }
}

impl Replacer for LruReplacer {
    fn victim(&self) -> Option<FrameId> {
        let mut list = self.list.lock();
        list.pop_back().map(|idx| FrameId::new(idx as u32))
    }

    fn pin(&self, frame_id: FrameId) {
        let idx = frame_id.as_usize();
        if idx >= self.capacity {
            return;
        }
        let mut list = self.list.lock();
        if list.in_list[idx] {
            list.unlink(idx);
        }
    }

    fn unpin(&self, frame_id: FrameId) {
        let idx = frame_id.as_usize();
        if idx >= self.capacity {
            return;
        }
        let mut list = self.list.lock();
        if !list.in_list[idx] && list.size < self.capacity {
            list.push_front(idx);
        }
    }

    fn size(&self) -> usize {
        self.list.lock().size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_replacer_empty() {
        let replacer = LruReplacer::new(4);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_lru_replacer_victim_order() {
        let replacer = LruReplacer::new(4);

        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));
        replacer.unpin(FrameId::new(2));

        assert_eq!(replacer.size(), 3);
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_lru_replacer_pin_removes() {
        let replacer = LruReplacer::new(4);

        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));

        replacer.pin(FrameId::new(0));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_lru_replacer_pin_absent_is_noop() {
        let replacer = LruReplacer::new(4);
        replacer.pin(FrameId::new(2));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_lru_replacer_double_unpin_keeps_position() {
        let replacer = LruReplacer::new(4);

        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));
        // second unpin of frame 0 must not move it to the MRU end
        replacer.unpin(FrameId::new(0));

        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_lru_replacer_capacity_bound() {
        let replacer = LruReplacer::new(2);

        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));
        assert_eq!(replacer.size(), 2);
    }

    #[test]
    fn test_lru_replacer_reinsert_after_pin() {
        let replacer = LruReplacer::new(8);

        replacer.unpin(FrameId::new(1));
        replacer.unpin(FrameId::new(2));
        replacer.unpin(FrameId::new(3));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));

        replacer.pin(FrameId::new(3));
        replacer.unpin(FrameId::new(4));
        replacer.unpin(FrameId::new(3));

        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), Some(FrameId::new(4)));
        assert_eq!(replacer.victim(), Some(FrameId::new(3)));
        assert_eq!(replacer.victim(), None);
    }
}
