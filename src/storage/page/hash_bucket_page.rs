use std::marker::PhantomData;

use crate::common::{bucket_array_size, PAGE_SIZE};
use crate::index::{KeyComparator, Storable};

/// Extendible hash bucket page layout:
///
/// +-------------------+
/// | occupied bitmap   |  ceil(N / 8) bytes
/// +-------------------+
/// | readable bitmap   |  ceil(N / 8) bytes
/// +-------------------+
/// | (key, value) * N  |
/// +-------------------+
///
/// `N` is derived from the encoded entry width so the page is as full as it
/// can be. A slot is *present* iff its readable bit is set. The occupied bit
/// is set only on the slot that receives a pair, never eagerly, so a probe
/// may stop at the first slot whose occupied bit is clear. A slot with
/// occupied set but readable clear is a tombstone left by a removal.
pub struct HashBucketPage<'a, K, V> {
    data: &'a mut [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: Storable, V: Storable> HashBucketPage<'a, K, V> {
    /// Number of (key, value) pairs this bucket holds.
    pub const ARRAY_SIZE: usize = bucket_array_size(K::SIZE + V::SIZE);
    const BITMAP_BYTES: usize = (Self::ARRAY_SIZE + 7) / 8;
    const READABLE_OFFSET: usize = Self::BITMAP_BYTES;
    const ARRAY_OFFSET: usize = 2 * Self::BITMAP_BYTES;

    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Collects the values of every present pair whose key matches.
    pub fn get_value<C: KeyComparator>(&self, key: &K, cmp: &C) -> Vec<V> {
        get_value::<K, V, C>(self.data, key, cmp)
    }

    /// Inserts the pair into the first non-readable slot. Returns false if
    /// the exact (key, value) pair is already present or the bucket has no
    /// slot left.
    pub fn insert<C: KeyComparator>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        let mut key_buf = vec![0u8; K::SIZE];
        key.encode(&mut key_buf);

        // reject an exact duplicate pair
        for i in 0..Self::ARRAY_SIZE {
            if !self.is_occupied(i) {
                break;
            }
            if !self.is_readable(i) {
                continue;
            }
            if cmp.compare(&key_buf, key_bytes::<K, V>(self.data, i)).is_eq()
                && V::decode(value_bytes::<K, V>(self.data, i)) == *value
            {
                return false;
            }
        }

        for i in 0..Self::ARRAY_SIZE {
            if self.is_readable(i) {
                continue;
            }
            let offset = slot_offset::<K, V>(i);
            key.encode(&mut self.data[offset..offset + K::SIZE]);
            value.encode(&mut self.data[offset + K::SIZE..offset + K::SIZE + V::SIZE]);
            self.set_occupied(i);
            self.set_readable(i);
            return true;
        }
        false
    }

    /// Clears the readable bit of the slot holding the exact pair, leaving a
    /// tombstone. Returns whether a slot was cleared.
    pub fn remove<C: KeyComparator>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        let mut key_buf = vec![0u8; K::SIZE];
        key.encode(&mut key_buf);

        for i in 0..Self::ARRAY_SIZE {
            if !self.is_occupied(i) {
                break;
            }
            if !self.is_readable(i) {
                continue;
            }
            if cmp.compare(&key_buf, key_bytes::<K, V>(self.data, i)).is_eq()
                && V::decode(value_bytes::<K, V>(self.data, i)) == *value
            {
                self.set_unreadable(i);
                return true;
            }
        }
        false
    }

    pub fn key_at(&self, slot: usize) -> K {
        K::decode(key_bytes::<K, V>(self.data, slot))
    }

    pub fn value_at(&self, slot: usize) -> V {
        V::decode(value_bytes::<K, V>(self.data, slot))
    }

    /// Copies out every present pair, in slot order.
    pub fn readable_pairs(&self) -> Vec<(K, V)> {
        (0..Self::ARRAY_SIZE)
            .filter(|&i| self.is_readable(i))
            .map(|i| (self.key_at(i), self.value_at(i)))
            .collect()
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        bit(self.data, 0, slot)
    }

    fn set_occupied(&mut self, slot: usize) {
        set_bit(self.data, 0, slot);
    }

    pub fn is_readable(&self, slot: usize) -> bool {
        bit(self.data, Self::READABLE_OFFSET, slot)
    }

    fn set_readable(&mut self, slot: usize) {
        set_bit(self.data, Self::READABLE_OFFSET, slot);
    }

    fn set_unreadable(&mut self, slot: usize) {
        clear_bit(self.data, Self::READABLE_OFFSET, slot);
    }

    pub fn num_readable(&self) -> usize {
        num_readable::<K, V>(self.data)
    }

    pub fn is_full(&self) -> bool {
        self.num_readable() == Self::ARRAY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }

    /// Zeroes both bitmaps and the pair array.
    pub fn clear(&mut self) {
        let end = Self::ARRAY_OFFSET + Self::ARRAY_SIZE * (K::SIZE + V::SIZE);
        self.data[..end].fill(0);
    }
}

/// Read-only view of a hash bucket page.
pub struct HashBucketPageRef<'a, K, V> {
    data: &'a [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: Storable, V: Storable> HashBucketPageRef<'a, K, V> {
    pub const ARRAY_SIZE: usize = bucket_array_size(K::SIZE + V::SIZE);

    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self {
            data,
            _marker: PhantomData,
        }
    }

    pub fn get_value<C: KeyComparator>(&self, key: &K, cmp: &C) -> Vec<V> {
        get_value::<K, V, C>(self.data, key, cmp)
    }

    pub fn num_readable(&self) -> usize {
        num_readable::<K, V>(self.data)
    }

    pub fn is_full(&self) -> bool {
        self.num_readable() == Self::ARRAY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }
}

fn slot_offset<K: Storable, V: Storable>(slot: usize) -> usize {
    let array_size = bucket_array_size(K::SIZE + V::SIZE);
    2 * ((array_size + 7) / 8) + slot * (K::SIZE + V::SIZE)
}

fn key_bytes<K: Storable, V: Storable>(data: &[u8], slot: usize) -> &[u8] {
    let offset = slot_offset::<K, V>(slot);
    &data[offset..offset + K::SIZE]
}

fn value_bytes<K: Storable, V: Storable>(data: &[u8], slot: usize) -> &[u8] {
    let offset = slot_offset::<K, V>(slot) + K::SIZE;
    &data[offset..offset + V::SIZE]
}

fn bit(data: &[u8], bitmap_offset: usize, slot: usize) -> bool {
    data[bitmap_offset + slot / 8] & (1 << (slot % 8)) != 0
}

fn set_bit(data: &mut [u8], bitmap_offset: usize, slot: usize) {
    data[bitmap_offset + slot / 8] |= 1 << (slot % 8);
}

fn clear_bit(data: &mut [u8], bitmap_offset: usize, slot: usize) {
    data[bitmap_offset + slot / 8] &= !(1 << (slot % 8));
}

fn get_value<K: Storable, V: Storable, C: KeyComparator>(
    data: &[u8],
    key: &K,
    cmp: &C,
) -> Vec<V> {
    let array_size = bucket_array_size(K::SIZE + V::SIZE);
    let readable_offset = (array_size + 7) / 8;

    let mut key_buf = vec![0u8; K::SIZE];
    key.encode(&mut key_buf);

    let mut result = Vec::new();
    for i in 0..array_size {
        if !bit(data, 0, i) {
            break;
        }
        if !bit(data, readable_offset, i) {
            continue;
        }
        if cmp.compare(&key_buf, key_bytes::<K, V>(data, i)).is_eq() {
            result.push(V::decode(value_bytes::<K, V>(data, i)));
        }
    }
    result
}

fn num_readable<K: Storable, V: Storable>(data: &[u8]) -> usize {
    let array_size = bucket_array_size(K::SIZE + V::SIZE);
    let readable_offset = (array_size + 7) / 8;
    data[readable_offset..readable_offset + (array_size + 7) / 8]
        .iter()
        .map(|b| b.count_ones() as usize)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IntegerComparator;

    type Bucket<'a> = HashBucketPage<'a, i32, i32>;

    #[test]
    fn test_bucket_insert_and_get() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        assert!(bucket.insert(&1, &10, &cmp));
        assert!(bucket.insert(&1, &11, &cmp));
        assert!(bucket.insert(&2, &20, &cmp));

        assert_eq!(bucket.get_value(&1, &cmp), vec![10, 11]);
        assert_eq!(bucket.get_value(&2, &cmp), vec![20]);
        assert_eq!(bucket.get_value(&3, &cmp), Vec::<i32>::new());
        assert_eq!(bucket.num_readable(), 3);
    }

    #[test]
    fn test_bucket_rejects_duplicate_pair() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        assert!(bucket.insert(&5, &50, &cmp));
        assert!(!bucket.insert(&5, &50, &cmp));
        assert_eq!(bucket.get_value(&5, &cmp), vec![50]);
    }

    #[test]
    fn test_bucket_remove_leaves_tombstone() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        assert!(bucket.insert(&1, &10, &cmp));
        assert!(bucket.insert(&2, &20, &cmp));

        assert!(bucket.remove(&1, &10, &cmp));
        assert!(!bucket.remove(&1, &10, &cmp));

        // slot 0 is a tombstone: occupied but not readable
        assert!(bucket.is_occupied(0));
        assert!(!bucket.is_readable(0));

        // probing must continue past the tombstone
        assert_eq!(bucket.get_value(&2, &cmp), vec![20]);
    }

    #[test]
    fn test_bucket_reuses_tombstone_slot() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        bucket.insert(&1, &10, &cmp);
        bucket.insert(&2, &20, &cmp);
        bucket.remove(&1, &10, &cmp);

        assert!(bucket.insert(&3, &30, &cmp));
        assert_eq!(bucket.key_at(0), 3);
        assert_eq!(bucket.value_at(0), 30);
    }

    #[test]
    fn test_bucket_fills_to_capacity() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        for i in 0..Bucket::ARRAY_SIZE as i32 {
            assert!(bucket.insert(&i, &i, &cmp), "slot {} rejected", i);
        }
        assert!(bucket.is_full());
        assert!(!bucket.insert(&-1, &-1, &cmp));
    }

    #[test]
    fn test_bucket_clear() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        bucket.insert(&1, &10, &cmp);
        bucket.clear();

        assert!(bucket.is_empty());
        assert!(!bucket.is_occupied(0));
        assert_eq!(bucket.get_value(&1, &cmp), Vec::<i32>::new());
    }

    #[test]
    fn test_bucket_readable_pairs() {
        let mut data = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut data);
        let cmp = IntegerComparator;

        bucket.insert(&1, &10, &cmp);
        bucket.insert(&2, &20, &cmp);
        bucket.remove(&1, &10, &cmp);

        assert_eq!(bucket.readable_pairs(), vec![(2, 20)]);
    }

    #[test]
    fn test_bucket_ref_view() {
        let mut data = [0u8; PAGE_SIZE];
        {
            let mut bucket = Bucket::new(&mut data);
            let cmp = IntegerComparator;
            bucket.insert(&7, &70, &cmp);
        }

        let bucket = HashBucketPageRef::<i32, i32>::new(&data);
        assert_eq!(bucket.get_value(&7, &IntegerComparator), vec![70]);
        assert_eq!(bucket.num_readable(), 1);
        assert!(!bucket.is_empty());
    }
}
