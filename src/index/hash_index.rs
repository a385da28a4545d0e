use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{QuarryError, RecordId, Result};
use crate::tuple::{Schema, Tuple};

use super::extendible_hash_table::ExtendibleHashTable;
use super::hash_function::HashFunction;
use super::key::{BytewiseComparator, GenericKey};

/// Width of the serialized key attributes an index entry stores. Longer
/// keys are truncated; the stored tuple remains the source of truth.
pub const INDEX_KEY_SIZE: usize = 8;

/// A secondary index over a table, backed by the extendible hash table.
/// Keys are tuples over the index's key schema (the table columns named by
/// `key_attrs`, in order), serialized into a fixed-width byte key.
pub struct HashIndex {
    table: ExtendibleHashTable<GenericKey<INDEX_KEY_SIZE>, RecordId, BytewiseComparator>,
    key_schema: Arc<Schema>,
    key_attrs: Vec<usize>,
}

impl HashIndex {
    pub fn new(
        bpm: Arc<dyn BufferPool>,
        key_schema: Arc<Schema>,
        key_attrs: Vec<usize>,
    ) -> Result<Self> {
        let table = ExtendibleHashTable::new(bpm, BytewiseComparator, HashFunction::new())?;
        Ok(Self {
            table,
            key_schema,
            key_attrs,
        })
    }

    pub fn key_schema(&self) -> &Arc<Schema> {
        &self.key_schema
    }

    /// Positions of the key columns in the table schema.
    pub fn key_attrs(&self) -> &[usize] {
        &self.key_attrs
    }

    fn encode_key(&self, key: &Tuple) -> Result<GenericKey<INDEX_KEY_SIZE>> {
        let all_columns: Vec<usize> = (0..key.len()).collect();
        let bytes = key
            .key_bytes(&all_columns)
            .ok_or(QuarryError::TupleEncoding)?;
        Ok(GenericKey::from_slice(&bytes))
    }

    /// Adds an entry mapping the key tuple to the record id. Returns false
    /// when the exact entry already exists.
    pub fn insert_entry(&self, key: &Tuple, rid: RecordId) -> Result<bool> {
        let key = self.encode_key(key)?;
        self.table.insert(&key, &rid)
    }

    /// Removes the entry. Returns false when it was not present.
    pub fn delete_entry(&self, key: &Tuple, rid: RecordId) -> Result<bool> {
        let key = self.encode_key(key)?;
        self.table.remove(&key, &rid)
    }

    /// Returns every record id stored under the key tuple.
    pub fn scan_key(&self, key: &Tuple) -> Result<Vec<RecordId>> {
        let key = self.encode_key(key)?;
        self.table.get_value(&key)
    }
}
