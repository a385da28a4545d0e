use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::buffer::{BufferPool, Frame};
use crate::common::{PageId, QuarryError, Result, MAX_GLOBAL_DEPTH};
use crate::storage::page::{
    HashBucketPage, HashBucketPageRef, HashDirectoryPage, HashDirectoryPageRef,
};

use super::hash_function::HashFunction;
use super::key::{KeyComparator, Storable};

/// Disk-backed extendible hash table. A single directory page maps the low
/// `global_depth` bits of a key's hash to bucket pages; buckets split (and
/// the directory doubles) on overflow and merge back when emptied.
///
/// The table does not own any pages: it pins them through the buffer pool
/// for the duration of each operation. Latching is two-level: the table
/// latch is taken in read mode by single-bucket operations and in write
/// mode by structural ones (split, merge); the per-page latch of a bucket
/// is taken inside the table latch.
pub struct ExtendibleHashTable<K, V, C> {
    directory_page_id: PageId,
    bpm: Arc<dyn BufferPool>,
    comparator: C,
    hash_fn: HashFunction,
    table_latch: RwLock<()>,
    _marker: PhantomData<(K, V)>,
}

impl<K: Storable, V: Storable, C: KeyComparator> ExtendibleHashTable<K, V, C> {
    /// Creates a new hash table with a single empty bucket at depth zero.
    pub fn new(bpm: Arc<dyn BufferPool>, comparator: C, hash_fn: HashFunction) -> Result<Self> {
        let (directory_page_id, dir_frame) = bpm.new_page()?;
        let (bucket_page_id, _bucket_frame) = bpm.new_page()?;

        {
            let mut data = dir_frame.write_data();
            let mut dir = HashDirectoryPage::new(&mut data[..]);
            dir.init(directory_page_id);
            dir.set_bucket_page_id(0, bucket_page_id);
            dir.set_local_depth(0, 0);
        }

        // a zero-filled page is already a valid empty bucket
        bpm.unpin_page(directory_page_id, true);
        bpm.unpin_page(bucket_page_id, true);

        Ok(Self {
            directory_page_id,
            bpm,
            comparator,
            hash_fn,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    /// Reopens a table whose directory already exists on disk.
    pub fn open(
        directory_page_id: PageId,
        bpm: Arc<dyn BufferPool>,
        comparator: C,
        hash_fn: HashFunction,
    ) -> Self {
        Self {
            directory_page_id,
            bpm,
            comparator,
            hash_fn,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        }
    }

    pub fn directory_page_id(&self) -> PageId {
        self.directory_page_id
    }

    fn hash(&self, key: &K) -> u32 {
        self.hash_fn.hash(key)
    }

    /// Directory slot and bucket page for the key under the given view.
    fn locate(&self, dir: &HashDirectoryPageRef<'_>, key: &K) -> (usize, PageId) {
        let idx = (self.hash(key) & dir.global_depth_mask()) as usize;
        (idx, dir.bucket_page_id(idx))
    }

    /// Returns every value stored under the key.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>> {
        let _table = self.table_latch.read();

        let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
        let (_, bucket_page_id) = {
            let data = dir_frame.read_data();
            let dir = HashDirectoryPageRef::new(&data[..]);
            self.locate(&dir, key)
        };

        let bucket_frame = self.bpm.fetch_page(bucket_page_id)?;
        let result = {
            let data = bucket_frame.read_data();
            let bucket = HashBucketPageRef::<K, V>::new(&data[..]);
            bucket.get_value(key, &self.comparator)
        };

        self.bpm.unpin_page(bucket_page_id, false);
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(result)
    }

    /// Inserts the pair, splitting buckets as needed. Returns false when the
    /// exact pair is already present.
    pub fn insert(&self, key: &K, value: &V) -> Result<bool> {
        {
            let _table = self.table_latch.read();

            let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
            let (_, bucket_page_id) = {
                let data = dir_frame.read_data();
                let dir = HashDirectoryPageRef::new(&data[..]);
                self.locate(&dir, key)
            };

            let bucket_frame = self.bpm.fetch_page(bucket_page_id)?;
            {
                let mut data = bucket_frame.write_data();
                let mut bucket = HashBucketPage::<K, V>::new(&mut data[..]);
                if !bucket.is_full() {
                    let inserted = bucket.insert(key, value, &self.comparator);
                    drop(data);
                    self.bpm.unpin_page(bucket_page_id, inserted);
                    self.bpm.unpin_page(self.directory_page_id, false);
                    return Ok(inserted);
                }
            }

            self.bpm.unpin_page(bucket_page_id, false);
            self.bpm.unpin_page(self.directory_page_id, false);
        }

        self.split_insert(key, value)
    }

    /// Slow insert path under the exclusive table latch. Splits the target
    /// bucket until the key's bucket has room; one insert may cascade
    /// several splits when the existing keys all share low hash bits.
    fn split_insert(&self, key: &K, value: &V) -> Result<bool> {
        let _table = self.table_latch.write();

        let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
        let result = self.split_insert_locked(&dir_frame, key, value);
        self.bpm.unpin_page(self.directory_page_id, true);
        result
    }

    fn split_insert_locked(&self, dir_frame: &Frame, key: &K, value: &V) -> Result<bool> {
        loop {
            let mut dir_data = dir_frame.write_data();
            let mut dir = HashDirectoryPage::new(&mut dir_data[..]);

            // the directory may have changed since the caller released its
            // latches; locate the bucket afresh on every round
            let bucket_idx = (self.hash(key) & dir.global_depth_mask()) as usize;
            let bucket_page_id = dir.bucket_page_id(bucket_idx);

            let bucket_frame = self.bpm.fetch_page(bucket_page_id)?;
            let mut bucket_data = bucket_frame.write_data();
            let mut bucket = HashBucketPage::<K, V>::new(&mut bucket_data[..]);

            if !bucket.is_full() {
                let inserted = bucket.insert(key, value, &self.comparator);
                drop(bucket_data);
                self.bpm.unpin_page(bucket_page_id, inserted);
                return Ok(inserted);
            }

            let needs_directory_growth =
                dir.local_depth(bucket_idx) as u32 == dir.global_depth();
            if needs_directory_growth && dir.global_depth() >= MAX_GLOBAL_DEPTH {
                drop(bucket_data);
                self.bpm.unpin_page(bucket_page_id, false);
                return Err(QuarryError::DirectoryOverflow);
            }

            // allocate the split image before touching the directory so an
            // allocation failure leaves the table consistent
            let (split_page_id, split_frame) = match self.bpm.new_page() {
                Ok(page) => page,
                Err(e) => {
                    drop(bucket_data);
                    self.bpm.unpin_page(bucket_page_id, false);
                    return Err(e);
                }
            };
            let mut split_data = split_frame.write_data();
            let mut split_bucket = HashBucketPage::<K, V>::new(&mut split_data[..]);

            if needs_directory_growth {
                dir.incr_global_depth();
            }
            dir.incr_local_depth(bucket_idx);

            let depth = dir.local_depth(bucket_idx);
            debug!(
                "splitting bucket {} at slot {} to depth {}",
                bucket_page_id, bucket_idx, depth
            );

            let pairs = bucket.readable_pairs();
            bucket.clear();

            // point every slot sharing the bucket's low depth-1 bits at the
            // original or the split image according to its depth'th bit
            let split_image_idx = dir.split_image_index(bucket_idx);
            Self::repoint_slots(&mut dir, bucket_idx, bucket_page_id, depth);
            Self::repoint_slots(&mut dir, split_image_idx, split_page_id, depth);

            // redistribute the old pairs between the two buckets
            let local_mask = dir.local_depth_mask(bucket_idx);
            let target_bits = bucket_idx as u32 & local_mask;
            for (k, v) in pairs {
                if self.hash(&k) & local_mask == target_bits {
                    bucket.insert(&k, &v, &self.comparator);
                } else {
                    split_bucket.insert(&k, &v, &self.comparator);
                }
            }

            drop(split_data);
            drop(bucket_data);
            self.bpm.unpin_page(bucket_page_id, true);
            self.bpm.unpin_page(split_page_id, true);
            // the key may still land in a full bucket; go around again
        }
    }

    /// Points every directory slot whose low `depth` bits equal those of
    /// `slot_idx` at the given bucket, stamping the new local depth.
    fn repoint_slots(
        dir: &mut HashDirectoryPage<'_>,
        slot_idx: usize,
        bucket_page_id: PageId,
        depth: u8,
    ) {
        let diff = 1usize << depth;
        let dir_size = dir.size();

        let mut i = slot_idx;
        loop {
            dir.set_bucket_page_id(i, bucket_page_id);
            dir.set_local_depth(i, depth);
            if i < diff {
                break;
            }
            i -= diff;
        }
        let mut i = slot_idx;
        while i < dir_size {
            dir.set_bucket_page_id(i, bucket_page_id);
            dir.set_local_depth(i, depth);
            i += diff;
        }
    }

    /// Removes the exact pair. Always follows up with a best-effort merge of
    /// the key's bucket.
    pub fn remove(&self, key: &K, value: &V) -> Result<bool> {
        let removed = {
            let _table = self.table_latch.read();

            let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
            let (_, bucket_page_id) = {
                let data = dir_frame.read_data();
                let dir = HashDirectoryPageRef::new(&data[..]);
                self.locate(&dir, key)
            };

            let bucket_frame = self.bpm.fetch_page(bucket_page_id)?;
            let removed = {
                let mut data = bucket_frame.write_data();
                let mut bucket = HashBucketPage::<K, V>::new(&mut data[..]);
                bucket.remove(key, value, &self.comparator)
            };

            self.bpm.unpin_page(bucket_page_id, removed);
            self.bpm.unpin_page(self.directory_page_id, false);
            removed
        };

        self.merge(key)?;
        Ok(removed)
    }

    /// Folds the key's bucket into its split image when the bucket is empty
    /// and both siblings sit at the same positive local depth, then shrinks
    /// the directory as far as possible. No-ops when a precondition fails.
    fn merge(&self, key: &K) -> Result<()> {
        let _table = self.table_latch.write();

        let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
        let result = self.merge_locked(&dir_frame, key);
        self.bpm
            .unpin_page(self.directory_page_id, matches!(result, Ok(true)));
        result.map(|_| ())
    }

    fn merge_locked(&self, dir_frame: &Frame, key: &K) -> Result<bool> {
        let mut dir_data = dir_frame.write_data();
        let mut dir = HashDirectoryPage::new(&mut dir_data[..]);

        let bucket_idx = (self.hash(key) & dir.global_depth_mask()) as usize;
        if dir.local_depth(bucket_idx) == 0 {
            return Ok(false);
        }

        let split_image_idx = dir.split_image_index(bucket_idx);
        if dir.local_depth(bucket_idx) != dir.local_depth(split_image_idx) {
            return Ok(false);
        }

        let bucket_page_id = dir.bucket_page_id(bucket_idx);
        let bucket_frame = self.bpm.fetch_page(bucket_page_id)?;
        let is_empty = {
            let data = bucket_frame.read_data();
            HashBucketPageRef::<K, V>::new(&data[..]).is_empty()
        };
        self.bpm.unpin_page(bucket_page_id, false);

        if !is_empty {
            return Ok(false);
        }

        debug!(
            "merging empty bucket {} at slot {} into its split image",
            bucket_page_id, bucket_idx
        );
        self.bpm.delete_page(bucket_page_id)?;

        let image_page_id = dir.bucket_page_id(split_image_idx);
        dir.decr_local_depth(bucket_idx);
        dir.decr_local_depth(split_image_idx);
        let depth = dir.local_depth(bucket_idx);

        for i in 0..dir.size() {
            if dir.bucket_page_id(i) == bucket_page_id {
                dir.set_bucket_page_id(i, image_page_id);
            }
            if dir.bucket_page_id(i) == image_page_id {
                dir.set_local_depth(i, depth);
            }
        }

        while dir.can_shrink() {
            dir.decr_global_depth();
        }

        Ok(true)
    }

    /// Current global depth of the directory.
    pub fn global_depth(&self) -> Result<u32> {
        let _table = self.table_latch.read();

        let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
        let depth = {
            let data = dir_frame.read_data();
            HashDirectoryPageRef::new(&data[..]).global_depth()
        };
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(depth)
    }

    /// Asserts the directory's structural invariants.
    pub fn verify_integrity(&self) -> Result<()> {
        let _table = self.table_latch.read();

        let dir_frame = self.bpm.fetch_page(self.directory_page_id)?;
        {
            let mut data = dir_frame.write_data();
            HashDirectoryPage::new(&mut data[..]).verify_integrity();
        }
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolInstance;
    use crate::index::IntegerComparator;
    use crate::storage::disk::DiskManager;
    use tempfile::NamedTempFile;

    fn create_table() -> (
        ExtendibleHashTable<i32, i32, IntegerComparator>,
        NamedTempFile,
    ) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm: Arc<dyn BufferPool> = Arc::new(BufferPoolInstance::new(50, dm));
        let table =
            ExtendibleHashTable::new(bpm, IntegerComparator, HashFunction::new()).unwrap();
        (table, temp_file)
    }

    #[test]
    fn test_insert_and_get() {
        let (table, _temp) = create_table();

        assert!(table.insert(&1, &10).unwrap());
        assert!(table.insert(&2, &20).unwrap());
        assert!(table.insert(&1, &11).unwrap());

        assert_eq!(table.get_value(&1).unwrap(), vec![10, 11]);
        assert_eq!(table.get_value(&2).unwrap(), vec![20]);
        assert_eq!(table.get_value(&3).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_duplicate_pair_is_rejected() {
        let (table, _temp) = create_table();

        assert!(table.insert(&7, &70).unwrap());
        assert!(!table.insert(&7, &70).unwrap());
        assert_eq!(table.get_value(&7).unwrap(), vec![70]);
    }

    #[test]
    fn test_remove() {
        let (table, _temp) = create_table();

        assert!(table.insert(&1, &10).unwrap());
        assert!(table.remove(&1, &10).unwrap());
        assert!(!table.remove(&1, &10).unwrap());
        assert_eq!(table.get_value(&1).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_split_preserves_pairs() {
        let (table, _temp) = create_table();

        let n = HashBucketPage::<i32, i32>::ARRAY_SIZE as i32 + 10;
        for i in 0..n {
            assert!(table.insert(&i, &i).unwrap());
        }
        assert!(table.global_depth().unwrap() >= 1);
        table.verify_integrity().unwrap();

        for i in 0..n {
            assert_eq!(table.get_value(&i).unwrap(), vec![i], "key {}", i);
        }
    }

    #[test]
    fn test_merge_shrinks_directory() {
        let (table, _temp) = create_table();

        // one split: two buckets at depth 1
        let n = HashBucketPage::<i32, i32>::ARRAY_SIZE as i32 + 1;
        for i in 0..n {
            assert!(table.insert(&i, &i).unwrap());
        }
        assert_eq!(table.global_depth().unwrap(), 1);

        // the first bucket to empty folds into its split image and the
        // directory halves back to a single slot
        for i in 0..n {
            assert!(table.remove(&i, &i).unwrap());
        }
        table.verify_integrity().unwrap();
        assert_eq!(table.global_depth().unwrap(), 0);

        for i in 0..n {
            assert_eq!(table.get_value(&i).unwrap(), Vec::<i32>::new());
        }
    }
}
