pub mod extendible_hash_table;
pub mod hash_function;
pub mod hash_index;
pub mod key;

pub use extendible_hash_table::ExtendibleHashTable;
pub use hash_function::{murmur3_32, HashFunction};
pub use hash_index::{HashIndex, INDEX_KEY_SIZE};
pub use key::{BytewiseComparator, GenericKey, IntegerComparator, KeyComparator, Storable};
