//! End-to-end tests for the extendible hash table

use std::sync::Arc;
use std::thread;

use quarry::buffer::{BufferPool, BufferPoolInstance};
use quarry::index::{ExtendibleHashTable, HashFunction, IntegerComparator};
use quarry::storage::disk::DiskManager;
use quarry::storage::page::HashBucketPage;
use tempfile::NamedTempFile;

const BUCKET_CAPACITY: usize = HashBucketPage::<'static, i32, i32>::ARRAY_SIZE;

fn create_table(
    pool_size: usize,
) -> (
    Arc<ExtendibleHashTable<i32, i32, IntegerComparator>>,
    NamedTempFile,
) {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    let bpm: Arc<dyn BufferPool> = Arc::new(BufferPoolInstance::new(pool_size, dm));
    let table = ExtendibleHashTable::new(bpm, IntegerComparator, HashFunction::new()).unwrap();
    (Arc::new(table), temp_file)
}

#[test]
fn test_first_split_grows_directory() {
    let (table, _temp) = create_table(100);

    // fill one bucket, then overflow it
    let n = BUCKET_CAPACITY as i32 + 1;
    for i in 0..n {
        assert!(table.insert(&i, &i).unwrap(), "insert {} failed", i);
    }

    assert_eq!(table.global_depth().unwrap(), 1);
    table.verify_integrity().unwrap();

    // everything inserted before and after the split is still reachable
    for i in 0..n {
        assert_eq!(table.get_value(&i).unwrap(), vec![i], "key {}", i);
    }
}

#[test]
fn test_duplicate_pair_insert_returns_false() {
    let (table, _temp) = create_table(20);

    assert!(table.insert(&5, &55).unwrap());
    assert!(!table.insert(&5, &55).unwrap());
    assert_eq!(table.get_value(&5).unwrap(), vec![55]);
}

#[test]
fn test_multiple_values_per_key() {
    let (table, _temp) = create_table(20);

    for v in 0..10 {
        assert!(table.insert(&1, &v).unwrap());
    }
    let mut values = table.get_value(&1).unwrap();
    values.sort_unstable();
    assert_eq!(values, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_remove_of_absent_pair_is_noop() {
    let (table, _temp) = create_table(20);

    assert!(table.insert(&1, &10).unwrap());
    assert!(!table.remove(&1, &99).unwrap());
    assert!(!table.remove(&2, &10).unwrap());
    assert_eq!(table.get_value(&1).unwrap(), vec![10]);
}

#[test]
fn test_membership_round_trip() {
    let (table, _temp) = create_table(100);

    // several values per key, many keys, spanning multiple splits
    let keys = 0..(BUCKET_CAPACITY as i32 * 2);
    for k in keys.clone() {
        assert!(table.insert(&k, &(k * 2)).unwrap());
        assert!(table.insert(&k, &(k * 2 + 1)).unwrap());
    }
    table.verify_integrity().unwrap();

    for k in keys {
        let mut values = table.get_value(&k).unwrap();
        values.sort_unstable();
        assert_eq!(values, vec![k * 2, k * 2 + 1]);
    }
}

#[test]
fn test_single_split_collapses_after_removal() {
    let (table, _temp) = create_table(100);

    let n = BUCKET_CAPACITY as i32 + 1;
    for i in 0..n {
        assert!(table.insert(&i, &i).unwrap());
    }
    assert_eq!(table.global_depth().unwrap(), 1);

    for i in 0..n {
        assert!(table.remove(&i, &i).unwrap(), "remove {} failed", i);
    }
    table.verify_integrity().unwrap();
    assert_eq!(table.global_depth().unwrap(), 0);

    // the table is usable after collapsing
    assert!(table.insert(&42, &42).unwrap());
    assert_eq!(table.get_value(&42).unwrap(), vec![42]);
}

#[test]
fn test_deep_table_drains_without_losing_structure() {
    let (table, _temp) = create_table(100);

    let n = BUCKET_CAPACITY as i32 * 4;
    for i in 0..n {
        assert!(table.insert(&i, &i).unwrap());
    }
    let grown = table.global_depth().unwrap();
    assert!(grown >= 2);

    for i in 0..n {
        assert!(table.remove(&i, &i).unwrap(), "remove {} failed", i);
    }
    table.verify_integrity().unwrap();
    assert!(table.global_depth().unwrap() <= grown);

    for i in 0..n {
        assert_eq!(table.get_value(&i).unwrap(), Vec::<i32>::new());
    }
}

#[test]
fn test_concurrent_inserts_and_lookups() {
    let (table, _temp) = create_table(200);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = t * 1000 + i;
                    assert!(table.insert(&key, &key).unwrap());
                }
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = t * 1000 + i;
                    assert_eq!(table.get_value(&key).unwrap(), vec![key]);
                }
            })
        })
        .collect();
    for handle in readers {
        handle.join().unwrap();
    }

    table.verify_integrity().unwrap();
}

#[test]
fn test_interleaved_insert_remove() {
    let (table, _temp) = create_table(100);

    for i in 0..500 {
        assert!(table.insert(&i, &i).unwrap());
        if i % 2 == 0 {
            assert!(table.remove(&i, &i).unwrap());
        }
    }

    for i in 0..500 {
        let expected: Vec<i32> = if i % 2 == 0 { vec![] } else { vec![i] };
        assert_eq!(table.get_value(&i).unwrap(), expected, "key {}", i);
    }
    table.verify_integrity().unwrap();
}
