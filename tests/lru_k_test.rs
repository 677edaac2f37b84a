//! Integration tests for the LRU-K replacer

use quarry::buffer::{AccessType, LruKReplacer};
use quarry::common::FrameId;

fn touch(replacer: &LruKReplacer, frame: u32) {
    replacer.record_access(FrameId::new(frame), AccessType::Unknown);
}

#[test]
fn test_lru_k_eviction_order() {
    let replacer = LruKReplacer::new(2, 10);

    for i in 0..5 {
        touch(&replacer, i);
        replacer.set_evictable(FrameId::new(i), true);
    }

    assert_eq!(replacer.size(), 5);

    // All frames have a single access (< k = 2), so all have +inf
    // distance and leave in order of their first access.
    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(FrameId::new(i)));
    }

    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_respects_k_distance() {
    let replacer = LruKReplacer::new(2, 10);

    // Frame 0: accessed once (+inf k-distance)
    touch(&replacer, 0);

    // Frames 1 and 2: accessed twice, frame 1 earlier
    touch(&replacer, 1);
    touch(&replacer, 1);
    touch(&replacer, 2);
    touch(&replacer, 2);

    for i in 0..3 {
        replacer.set_evictable(FrameId::new(i), true);
    }

    // +inf distance wins, then the larger finite distance.
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
}

#[test]
fn test_lru_k_non_evictable_frames_skipped() {
    let replacer = LruKReplacer::new(2, 10);

    touch(&replacer, 0);
    touch(&replacer, 1);
    touch(&replacer, 2);

    replacer.set_evictable(FrameId::new(1), true);
    replacer.set_evictable(FrameId::new(2), true);

    assert_eq!(replacer.size(), 2);

    // Frame 0 must never come out.
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_toggle_evictable() {
    let replacer = LruKReplacer::new(2, 10);

    touch(&replacer, 0);
    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.size(), 1);

    replacer.set_evictable(FrameId::new(0), false);
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);

    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_lru_k_remove() {
    let replacer = LruKReplacer::new(2, 10);

    touch(&replacer, 0);
    touch(&replacer, 1);
    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    assert_eq!(replacer.size(), 2);

    replacer.remove(FrameId::new(0));
    assert_eq!(replacer.size(), 1);

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_infinite_distance_ties_break_by_first_access() {
    let replacer = LruKReplacer::new(3, 10);

    // All frames have fewer than k = 3 accesses.
    touch(&replacer, 0);
    touch(&replacer, 1);
    touch(&replacer, 1);
    touch(&replacer, 2);

    for i in 0..3 {
        replacer.set_evictable(FrameId::new(i), true);
    }

    // Ties at +inf break on the earliest overall access.
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
}

#[test]
fn test_lru_k_history_is_bounded() {
    let replacer = LruKReplacer::new(2, 10);

    // Many accesses long ago, then frame 1 more recently.
    for _ in 0..10 {
        touch(&replacer, 0);
    }
    touch(&replacer, 1);
    touch(&replacer, 1);

    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    // Only the last k accesses count: frame 0's k-th most recent access
    // is older than frame 1's.
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
}

#[test]
fn test_lru_k_concurrent_access() {
    use std::sync::Arc;
    use std::thread;

    let replacer = Arc::new(LruKReplacer::new(2, 100));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let replacer = Arc::clone(&replacer);
            thread::spawn(move || {
                for i in 0..25 {
                    let frame_id = FrameId::new((t * 25 + i) as u32);
                    replacer.record_access(frame_id, AccessType::Unknown);
                    replacer.set_evictable(frame_id, true);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(replacer.size(), 100);

    for _ in 0..100 {
        assert!(replacer.evict().is_some());
    }
    assert_eq!(replacer.size(), 0);
}
