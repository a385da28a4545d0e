use super::key::Storable;

/// 32-bit Murmur3 over the key's encoded bytes. Extendible hashing only
/// consumes the low `global_depth` bits, so good low-bit mixing matters.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k: u32 = 0;
        for (i, &b) in tail.iter().enumerate() {
            k |= (b as u32) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

/// Hashes storable keys down to the 32 bits the directory indexes with.
#[derive(Clone, Copy)]
pub struct HashFunction {
    seed: u32,
}

impl HashFunction {
    pub fn new() -> Self {
        Self { seed: 0 }
    }

    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    pub fn hash<K: Storable>(&self, key: &K) -> u32 {
        let mut buf = vec![0u8; K::SIZE];
        key.encode(&mut buf);
        murmur3_32(&buf, self.seed)
    }
}

impl Default for HashFunction {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_is_deterministic() {
        let a = murmur3_32(b"quarry", 0);
        let b = murmur3_32(b"quarry", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_murmur3_seed_changes_hash() {
        assert_ne!(murmur3_32(b"quarry", 0), murmur3_32(b"quarry", 1));
    }

    #[test]
    fn test_murmur3_reference_vectors() {
        // published test vectors for Murmur3 x86 32-bit
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e_28b7);
        assert_eq!(murmur3_32(b"hello", 0), 0x248b_fa47);
        assert_eq!(murmur3_32(b"hello, world", 0), 0x149b_bb7f);
    }

    #[test]
    fn test_hash_function_over_keys() {
        let hash_fn = HashFunction::new();
        assert_eq!(hash_fn.hash(&42u32), hash_fn.hash(&42u32));
        assert_ne!(hash_fn.hash(&42u32), hash_fn.hash(&43u32));
    }
}
