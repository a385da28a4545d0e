use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{IndexOid, QuarryError, Result, TableOid};
use crate::index::HashIndex;
use crate::storage::TableHeap;
use crate::tuple::Schema;

/// Everything the executors need to know about a table.
pub struct TableInfo {
    pub schema: Arc<Schema>,
    pub name: String,
    pub table: Arc<TableHeap>,
    pub oid: TableOid,
}

/// Everything the executors need to know about an index.
pub struct IndexInfo {
    pub key_schema: Arc<Schema>,
    pub name: String,
    pub index: HashIndex,
    pub index_oid: IndexOid,
    pub table_name: String,
}

/// In-memory catalog mapping names and oids to tables and indexes. Schema
/// changes happen before query execution, so mutation takes `&mut self`
/// while lookups work on shared references.
pub struct Catalog {
    bpm: Arc<dyn BufferPool>,
    tables: HashMap<TableOid, Arc<TableInfo>>,
    table_names: HashMap<String, TableOid>,
    indexes: HashMap<IndexOid, Arc<IndexInfo>>,
    /// table name -> index name -> index oid
    index_names: HashMap<String, HashMap<String, IndexOid>>,
    next_table_oid: TableOid,
    next_index_oid: IndexOid,
}

impl Catalog {
    pub fn new(bpm: Arc<dyn BufferPool>) -> Self {
        Self {
            bpm,
            tables: HashMap::new(),
            table_names: HashMap::new(),
            indexes: HashMap::new(),
            index_names: HashMap::new(),
            next_table_oid: 0,
            next_index_oid: 0,
        }
    }

    pub fn create_table(&mut self, name: &str, schema: Arc<Schema>) -> Result<Arc<TableInfo>> {
        if self.table_names.contains_key(name) {
            return Err(QuarryError::TableAlreadyExists(name.to_string()));
        }

        let oid = self.next_table_oid;
        self.next_table_oid += 1;

        let table = Arc::new(TableHeap::new(Arc::clone(&self.bpm), Arc::clone(&schema))?);
        let info = Arc::new(TableInfo {
            schema,
            name: name.to_string(),
            table,
            oid,
        });

        self.tables.insert(oid, Arc::clone(&info));
        self.table_names.insert(name.to_string(), oid);
        self.index_names.insert(name.to_string(), HashMap::new());
        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.tables.get(&oid).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        self.table_names
            .get(name)
            .and_then(|oid| self.tables.get(oid))
            .cloned()
    }

    /// Creates a hash index over the given table columns and backfills it
    /// from the rows already in the heap.
    pub fn create_index(
        &mut self,
        index_name: &str,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>> {
        let table_info = self
            .get_table_by_name(table_name)
            .ok_or_else(|| QuarryError::UnknownTable(table_name.to_string()))?;

        let names = self
            .index_names
            .get_mut(table_name)
            .expect("index map exists for every table");
        if names.contains_key(index_name) {
            return Err(QuarryError::IndexAlreadyExists(
                index_name.to_string(),
                table_name.to_string(),
            ));
        }

        let key_schema = Arc::new(
            table_info
                .schema
                .project(&key_attrs)
                .ok_or(QuarryError::TupleEncoding)?,
        );
        let index = HashIndex::new(
            Arc::clone(&self.bpm),
            Arc::clone(&key_schema),
            key_attrs.clone(),
        )?;

        let mut iter = table_info.table.iter();
        while let Some((rid, tuple)) = iter.next()? {
            let key = tuple.project(&key_attrs).ok_or(QuarryError::TupleEncoding)?;
            index.insert_entry(&key, rid)?;
        }

        let index_oid = self.next_index_oid;
        self.next_index_oid += 1;

        let info = Arc::new(IndexInfo {
            key_schema,
            name: index_name.to_string(),
            index,
            index_oid,
            table_name: table_name.to_string(),
        });

        names.insert(index_name.to_string(), index_oid);
        self.indexes.insert(index_oid, Arc::clone(&info));
        Ok(info)
    }

    pub fn get_index(&self, index_oid: IndexOid) -> Option<Arc<IndexInfo>> {
        self.indexes.get(&index_oid).cloned()
    }

    /// All indexes declared on a table.
    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        self.index_names
            .get(table_name)
            .map(|names| {
                names
                    .values()
                    .filter_map(|oid| self.indexes.get(oid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolInstance;
    use crate::storage::disk::DiskManager;
    use crate::tuple::{DataType, Tuple, Value};
    use tempfile::NamedTempFile;

    fn create_catalog() -> (Catalog, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm: Arc<dyn BufferPool> = Arc::new(BufferPoolInstance::new(50, dm));
        (Catalog::new(bpm), temp_file)
    }

    fn sample_schema() -> Arc<Schema> {
        Schema::shared(vec![
            ("id", DataType::Integer),
            ("name", DataType::VarChar(32)),
        ])
    }

    #[test]
    fn test_create_and_lookup_table() {
        let (mut catalog, _temp) = create_catalog();

        let info = catalog.create_table("users", sample_schema()).unwrap();
        assert_eq!(info.name, "users");

        assert!(catalog.get_table(info.oid).is_some());
        assert!(catalog.get_table_by_name("users").is_some());
        assert!(catalog.get_table_by_name("missing").is_none());

        assert!(matches!(
            catalog.create_table("users", sample_schema()),
            Err(QuarryError::TableAlreadyExists(_))
        ));
    }

    #[test]
    fn test_create_index_backfills_existing_rows() {
        let (mut catalog, _temp) = create_catalog();

        let info = catalog.create_table("users", sample_schema()).unwrap();
        let rid = info
            .table
            .insert_tuple(&Tuple::new(
                Arc::clone(&info.schema),
                vec![Value::Integer(7), Value::Varchar("ann".into())],
            ))
            .unwrap();

        let index_info = catalog.create_index("users_id", "users", vec![0]).unwrap();
        let probe = Tuple::new(Arc::clone(&index_info.key_schema), vec![Value::Integer(7)]);
        assert_eq!(index_info.index.scan_key(&probe).unwrap(), vec![rid]);

        assert_eq!(catalog.get_table_indexes("users").len(), 1);
        assert!(catalog.get_table_indexes("empty").is_empty());
    }
}
