//! In-memory catalog: table and index metadata for the executors.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::BufferPoolManager;
use crate::common::{Oid, QuarryError, Result};
use crate::index::{BPlusTree, IntegerComparator};
use crate::storage::table::TableHeap;
use crate::tuple::{Schema, Tuple, Value};

/// Metadata for one table.
pub struct TableInfo {
    pub oid: Oid,
    pub name: String,
    pub schema: Schema,
    pub heap: Arc<TableHeap>,
}

/// Metadata for one single-column B+Tree index.
pub struct IndexInfo {
    pub oid: Oid,
    pub name: String,
    pub table_oid: Oid,
    /// Index of the covered column in the table schema.
    pub key_column: usize,
    pub index: Arc<BPlusTree>,
}

impl IndexInfo {
    /// The index key of a table tuple, or `None` when the key column is
    /// null (null keys are not indexed).
    pub fn key_of(&self, tuple: &Tuple) -> Option<i64> {
        tuple.value(self.key_column).as_i64()
    }

    /// The index key for a literal predicate value.
    pub fn key_of_value(&self, value: &Value) -> Option<i64> {
        value.as_i64()
    }
}

/// Registry of tables and indexes backing the executors. Metadata is
/// in-memory only; the table heaps and index pages live in the buffer
/// pool like any other page.
pub struct Catalog {
    bpm: Arc<BufferPoolManager>,
    tables: RwLock<HashMap<Oid, Arc<TableInfo>>>,
    table_names: RwLock<HashMap<String, Oid>>,
    indexes: RwLock<HashMap<Oid, Arc<IndexInfo>>>,
    next_oid: RwLock<Oid>,
}

impl Catalog {
    pub fn new(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            tables: RwLock::new(HashMap::new()),
            table_names: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
            next_oid: RwLock::new(0),
        }
    }

    fn allocate_oid(&self) -> Oid {
        let mut next = self.next_oid.write();
        let oid = *next;
        *next += 1;
        oid
    }

    pub fn create_table(&self, name: impl Into<String>, schema: Schema) -> Result<Arc<TableInfo>> {
        let name = name.into();
        let heap = Arc::new(TableHeap::new(Arc::clone(&self.bpm))?);
        let info = Arc::new(TableInfo {
            oid: self.allocate_oid(),
            name: name.clone(),
            schema,
            heap,
        });
        self.tables.write().insert(info.oid, Arc::clone(&info));
        self.table_names.write().insert(name, info.oid);
        Ok(info)
    }

    pub fn get_table(&self, oid: Oid) -> Result<Arc<TableInfo>> {
        self.tables
            .read()
            .get(&oid)
            .cloned()
            .ok_or(QuarryError::TableNotFound(oid))
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let oid = *self.table_names.read().get(name)?;
        self.tables.read().get(&oid).cloned()
    }

    /// Creates a single-column B+Tree index and backfills it from the
    /// table's current live tuples.
    pub fn create_index(
        &self,
        name: impl Into<String>,
        table_oid: Oid,
        key_column: usize,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Arc<IndexInfo>> {
        let table = self.get_table(table_oid)?;
        assert!(key_column < table.schema.num_columns());

        let index = Arc::new(BPlusTree::new(
            Arc::clone(&self.bpm),
            Arc::new(IntegerComparator),
            leaf_max_size,
            internal_max_size,
        )?);

        let info = Arc::new(IndexInfo {
            oid: self.allocate_oid(),
            name: name.into(),
            table_oid,
            key_column,
            index,
        });

        // Backfill from the heap.
        let mut iterator = table.heap.iter();
        while let Some((rid, bytes, deleted)) = iterator.next()? {
            if deleted {
                continue;
            }
            let tuple = Tuple::from_bytes(&table.schema, &bytes);
            if let Some(key) = info.key_of(&tuple) {
                info.index.insert(key, rid)?;
            }
        }

        self.indexes.write().insert(info.oid, Arc::clone(&info));
        Ok(info)
    }

    pub fn get_index(&self, oid: Oid) -> Result<Arc<IndexInfo>> {
        self.indexes
            .read()
            .get(&oid)
            .cloned()
            .ok_or(QuarryError::IndexNotFound(oid))
    }

    /// Every index covering the given table.
    pub fn table_indexes(&self, table_oid: Oid) -> Vec<Arc<IndexInfo>> {
        let mut indexes: Vec<_> = self
            .indexes
            .read()
            .values()
            .filter(|info| info.table_oid == table_oid)
            .cloned()
            .collect();
        indexes.sort_by_key(|info| info.oid);
        indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::DiskManager;
    use crate::tuple::{Column, DataType};
    use tempfile::NamedTempFile;

    fn setup() -> (Arc<Catalog>, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(64, 2, dm));
        (Arc::new(Catalog::new(bpm)), temp_file)
    }

    #[test]
    fn test_catalog_create_and_lookup_table() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::BigInt)]);
        let table = catalog.create_table("users", schema).unwrap();

        assert_eq!(catalog.get_table(table.oid).unwrap().name, "users");
        assert!(catalog.get_table_by_name("users").is_some());
        assert!(catalog.get_table(999).is_err());
    }

    #[test]
    fn test_catalog_index_backfill() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::BigInt)]);
        let table = catalog.create_table("t", schema.clone()).unwrap();

        for id in [5i64, 1, 9] {
            let tuple = Tuple::new(vec![Value::BigInt(id)]);
            table
                .heap
                .insert_tuple(&tuple.to_bytes(&schema).unwrap())
                .unwrap();
        }

        let index = catalog.create_index("t_id", table.oid, 0, 16, 16).unwrap();
        assert!(index.index.get_value(5).unwrap().is_some());
        assert!(index.index.get_value(2).unwrap().is_none());
        assert_eq!(catalog.table_indexes(table.oid).len(), 1);
        assert!(catalog.table_indexes(999).is_empty());
    }
}
