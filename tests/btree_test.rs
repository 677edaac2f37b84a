//! Integration tests for the B+Tree index

use std::sync::Arc;

use quarry::buffer::BufferPoolManager;
use quarry::common::{PageId, RecordId, SlotId};
use quarry::index::{BPlusTree, IntegerComparator};
use quarry::storage::disk::DiskManager;

use tempfile::NamedTempFile;

fn create_bpm(pool_size: usize) -> (Arc<BufferPoolManager>, NamedTempFile) {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_file = NamedTempFile::new().unwrap();
    let disk_manager = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    let bpm = Arc::new(BufferPoolManager::new(pool_size, 2, disk_manager));
    (bpm, temp_file)
}

fn create_tree(
    bpm: &Arc<BufferPoolManager>,
    leaf_max: usize,
    internal_max: usize,
) -> BPlusTree {
    BPlusTree::new(
        Arc::clone(bpm),
        Arc::new(IntegerComparator),
        leaf_max,
        internal_max,
    )
    .unwrap()
}

fn rid(key: i64) -> RecordId {
    RecordId::new(PageId::new(key as i32), SlotId::new(0))
}

fn collect_keys(iter: quarry::index::BPlusTreeIterator) -> Vec<i64> {
    iter.map(|entry| entry.unwrap().0).collect()
}

#[test]
fn test_btree_starts_empty() {
    let (bpm, _temp) = create_bpm(16);
    let tree = create_tree(&bpm, 4, 4);

    assert!(tree.is_empty().unwrap());
    assert_eq!(tree.get_value(1).unwrap(), None);
    assert!(tree.begin().unwrap().is_end());
}

#[test]
fn test_btree_insert_and_get() {
    let (bpm, _temp) = create_bpm(16);
    let tree = create_tree(&bpm, 4, 4);

    assert!(tree.insert(10, rid(10)).unwrap());
    assert!(tree.insert(20, rid(20)).unwrap());
    assert!(tree.insert(30, rid(30)).unwrap());

    assert_eq!(tree.get_value(10).unwrap(), Some(rid(10)));
    assert_eq!(tree.get_value(20).unwrap(), Some(rid(20)));
    assert_eq!(tree.get_value(30).unwrap(), Some(rid(30)));
    assert_eq!(tree.get_value(40).unwrap(), None);
}

#[test]
fn test_btree_duplicate_insert_rejected() {
    let (bpm, _temp) = create_bpm(16);
    let tree = create_tree(&bpm, 4, 4);

    assert!(tree.insert(7, rid(7)).unwrap());
    assert!(!tree.insert(7, rid(99)).unwrap());

    // The original value survives the rejected insert.
    assert_eq!(tree.get_value(7).unwrap(), Some(rid(7)));
    tree.verify_integrity().unwrap();
}

/// Keys 1..=100 with tiny fanouts: iterating from begin() yields exactly
/// 1..=100, and from begin_at(50) yields 50..=100.
#[test]
fn test_btree_iterate_sequential_keys() {
    let (bpm, _temp) = create_bpm(128);
    let tree = create_tree(&bpm, 4, 4);

    for key in 1..=100 {
        assert!(tree.insert(key, rid(key)).unwrap(), "insert {key}");
    }
    tree.verify_integrity().unwrap();

    let keys = collect_keys(tree.begin().unwrap());
    assert_eq!(keys, (1..=100).collect::<Vec<_>>());

    let from_fifty = collect_keys(tree.begin_at(50).unwrap());
    assert_eq!(from_fifty, (50..=100).collect::<Vec<_>>());

    // Seeking between keys positions at the next larger one.
    for key in 1..=100 {
        assert_eq!(tree.get_value(key).unwrap(), Some(rid(key)));
    }
}

#[test]
fn test_btree_begin_at_missing_key() {
    let (bpm, _temp) = create_bpm(64);
    let tree = create_tree(&bpm, 4, 4);

    for key in (2..=40).step_by(2) {
        tree.insert(key, rid(key)).unwrap();
    }

    // 15 is absent; iteration starts at 16.
    let keys = collect_keys(tree.begin_at(15).unwrap());
    assert_eq!(keys[0], 16);
    assert_eq!(*keys.last().unwrap(), 40);

    // Past the largest key the iterator is exhausted.
    assert!(tree.begin_at(41).unwrap().is_end());
}

/// Keys 1..=10, delete 5, 6, 7: iteration skips them, re-inserting 6
/// succeeds once and then reports the duplicate.
#[test]
fn test_btree_delete_and_reinsert() {
    let (bpm, _temp) = create_bpm(64);
    let tree = create_tree(&bpm, 4, 4);

    for key in 1..=10 {
        tree.insert(key, rid(key)).unwrap();
    }
    for key in [5, 6, 7] {
        tree.remove(key).unwrap();
    }
    tree.verify_integrity().unwrap();

    let keys = collect_keys(tree.begin().unwrap());
    assert_eq!(keys, vec![1, 2, 3, 4, 8, 9, 10]);

    assert!(tree.insert(6, rid(6)).unwrap());
    assert!(!tree.insert(6, rid(6)).unwrap());
    let keys = collect_keys(tree.begin().unwrap());
    assert_eq!(keys, vec![1, 2, 3, 4, 6, 8, 9, 10]);
}

#[test]
fn test_btree_remove_absent_key_is_noop() {
    let (bpm, _temp) = create_bpm(16);
    let tree = create_tree(&bpm, 4, 4);

    tree.remove(3).unwrap();

    tree.insert(1, rid(1)).unwrap();
    tree.remove(3).unwrap();
    assert_eq!(tree.get_value(1).unwrap(), Some(rid(1)));
}

#[test]
fn test_btree_delete_everything_frees_pages() {
    let (bpm, _temp) = create_bpm(256);
    let tree = create_tree(&bpm, 4, 4);

    for key in 1..=200 {
        tree.insert(key, rid(key)).unwrap();
    }
    for key in 1..=200 {
        tree.remove(key).unwrap();
    }

    assert!(tree.is_empty().unwrap());
    assert!(tree.begin().unwrap().is_end());

    // Every index page except the header went back to the pool.
    assert_eq!(bpm.free_frame_count(), 256 - 1);
}

#[test]
fn test_btree_reverse_insert_order() {
    let (bpm, _temp) = create_bpm(128);
    let tree = create_tree(&bpm, 4, 4);

    for key in (1..=100).rev() {
        tree.insert(key, rid(key)).unwrap();
    }
    tree.verify_integrity().unwrap();

    let keys = collect_keys(tree.begin().unwrap());
    assert_eq!(keys, (1..=100).collect::<Vec<_>>());
}

#[test]
fn test_btree_random_workload() {
    use rand::seq::SliceRandom;
    use rand::thread_rng;

    let (bpm, _temp) = create_bpm(512);
    let tree = create_tree(&bpm, 6, 5);
    let mut rng = thread_rng();

    let mut keys: Vec<i64> = (0..500).collect();
    keys.shuffle(&mut rng);
    for &key in &keys {
        assert!(tree.insert(key, rid(key)).unwrap());
    }
    tree.verify_integrity().unwrap();

    for &key in &keys {
        assert_eq!(tree.get_value(key).unwrap(), Some(rid(key)), "lookup {key}");
    }

    // Remove a random half and verify the survivors.
    keys.shuffle(&mut rng);
    let (removed, kept) = keys.split_at(250);
    for &key in removed {
        tree.remove(key).unwrap();
    }
    tree.verify_integrity().unwrap();

    for &key in removed {
        assert_eq!(tree.get_value(key).unwrap(), None);
    }
    for &key in kept {
        assert_eq!(tree.get_value(key).unwrap(), Some(rid(key)));
    }

    // Remove the rest; the tree must end up empty.
    for &key in kept {
        tree.remove(key).unwrap();
    }
    assert!(tree.is_empty().unwrap());
}

#[test]
fn test_btree_larger_fanout() {
    let (bpm, _temp) = create_bpm(128);
    let tree = create_tree(&bpm, 32, 16);

    for key in 0..2000 {
        tree.insert(key * 3, rid(key)).unwrap();
    }
    tree.verify_integrity().unwrap();

    assert_eq!(tree.get_value(999).unwrap(), Some(rid(333)));
    assert_eq!(tree.get_value(1000).unwrap(), None);

    let from = collect_keys(tree.begin_at(5000).unwrap());
    assert_eq!(from.first(), Some(&5001));
    assert_eq!(from.len(), 2000 - 1667);
}

#[test]
fn test_btree_reopen_by_header_page() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    let header_page_id = {
        let disk_manager = Arc::new(DiskManager::new(&path).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
        let tree = create_tree(&bpm, 4, 4);
        for key in 1..=50 {
            tree.insert(key, rid(key)).unwrap();
        }
        bpm.flush_all_pages().unwrap();
        tree.header_page_id()
    };

    {
        let disk_manager = Arc::new(DiskManager::new(&path).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
        let tree = BPlusTree::open(
            header_page_id,
            Arc::clone(&bpm),
            Arc::new(IntegerComparator),
            4,
            4,
        );
        for key in 1..=50 {
            assert_eq!(tree.get_value(key).unwrap(), Some(rid(key)), "reload {key}");
        }
        let keys = collect_keys(tree.begin().unwrap());
        assert_eq!(keys, (1..=50).collect::<Vec<_>>());
    }
}

#[test]
fn test_btree_concurrent_disjoint_inserts() {
    use std::thread;

    let (bpm, _temp) = create_bpm(512);
    let tree = Arc::new(create_tree(&bpm, 16, 16));

    let handles: Vec<_> = (0..4i64)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for i in 0..250i64 {
                    let key = t * 1000 + i;
                    assert!(tree.insert(key, rid(key)).unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    tree.verify_integrity().unwrap();
    for t in 0..4i64 {
        for i in 0..250i64 {
            let key = t * 1000 + i;
            assert_eq!(tree.get_value(key).unwrap(), Some(rid(key)));
        }
    }
}
