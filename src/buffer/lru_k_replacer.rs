use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{FrameId, Timestamp};

/// How a frame was touched. Currently informational only; every access
/// kind weighs the same in the eviction decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Unknown,
    Lookup,
    Scan,
    Index,
}

/// Access history for a single frame
#[derive(Debug)]
struct FrameAccessInfo {
    /// The last k access timestamps (most recent at the back)
    history: VecDeque<Timestamp>,
    /// Whether this frame may currently be evicted
    is_evictable: bool,
}

impl FrameAccessInfo {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance from `now`. `None` means fewer than k recorded
    /// accesses, i.e. +inf distance.
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Option<Timestamp> {
        self.history.front().copied()
    }
}

#[derive(Debug)]
struct ReplacerState {
    /// Per-frame access records
    frames: HashMap<FrameId, FrameAccessInfo>,
    /// Number of evictable frames
    evictable_count: usize,
    /// Monotonic logical clock; advanced on every recorded access
    current_timestamp: Timestamp,
}

/// LRU-K replacement policy.
///
/// Evicts the evictable frame with the largest backward k-distance, where
/// backward k-distance is the difference between the current timestamp
/// and the timestamp of the k-th most recent access. A frame with fewer
/// than k recorded accesses has +inf distance; ties among +inf frames are
/// broken by the earliest overall access timestamp (classical LRU).
pub struct LruKReplacer {
    k: usize,
    /// Maximum number of frames this replacer may track
    max_frames: usize,
    state: Mutex<ReplacerState>,
}

impl LruKReplacer {
    pub fn new(k: usize, max_frames: usize) -> Self {
        assert!(k > 0, "LRU-K requires k > 0");
        Self {
            k,
            max_frames,
            state: Mutex::new(ReplacerState {
                frames: HashMap::new(),
                evictable_count: 0,
                current_timestamp: 0,
            }),
        }
    }

    /// Evicts the frame with the largest backward k-distance and removes
    /// its access record. Returns None when no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();

        if state.evictable_count == 0 {
            return None;
        }

        let now = state.current_timestamp;

        let mut victim: Option<FrameId> = None;
        let mut victim_k_dist: Option<Timestamp> = None;
        let mut victim_earliest: Option<Timestamp> = None;

        for (&frame_id, info) in state.frames.iter() {
            if !info.is_evictable {
                continue;
            }

            let k_dist = info.k_distance(now, self.k);
            let earliest = info.earliest_timestamp();

            let replaces = match (victim_k_dist, k_dist) {
                // Candidate has +inf, current victim does not
                (Some(_), None) => true,
                // Candidate finite, victim +inf
                (None, Some(_)) => false,
                // Both +inf: earliest first access wins
                (None, None) => match (victim_earliest, earliest) {
                    (Some(v), Some(c)) => c < v,
                    (None, Some(_)) => true,
                    _ => false,
                },
                // Both finite: larger distance wins
                (Some(v), Some(c)) => c > v,
            };

            if victim.is_none() || replaces {
                victim = Some(frame_id);
                victim_k_dist = k_dist;
                victim_earliest = earliest;
            }
        }

        if let Some(frame_id) = victim {
            state.frames.remove(&frame_id);
            state.evictable_count -= 1;
        }

        victim
    }

    /// Records an access to the given frame at the current timestamp,
    /// creating the record if missing.
    ///
    /// Panics if the frame id is outside the replacer's capacity.
    pub fn record_access(&self, frame_id: FrameId, _access_type: AccessType) {
        assert!(
            frame_id.as_usize() < self.max_frames,
            "{frame_id} out of range for replacer of {} frames",
            self.max_frames
        );

        let mut state = self.state.lock();
        state.current_timestamp += 1;
        let timestamp = state.current_timestamp;
        let k = self.k;
        state
            .frames
            .entry(frame_id)
            .or_insert_with(FrameAccessInfo::new)
            .record_access(timestamp, k);
    }

    /// Toggles whether a frame may be evicted, adjusting the evictable
    /// count. No-op when the state is unchanged or the frame has no
    /// access record.
    ///
    /// Panics if the frame id is outside the replacer's capacity.
    pub fn set_evictable(&self, frame_id: FrameId, is_evictable: bool) {
        assert!(
            frame_id.as_usize() < self.max_frames,
            "{frame_id} out of range for replacer of {} frames",
            self.max_frames
        );

        let mut state = self.state.lock();
        if let Some(info) = state.frames.get_mut(&frame_id) {
            if info.is_evictable != is_evictable {
                info.is_evictable = is_evictable;
                if is_evictable {
                    state.evictable_count += 1;
                } else {
                    state.evictable_count -= 1;
                }
            }
        }
    }

    /// Removes a frame's access record entirely.
    ///
    /// Panics if the frame is tracked but not evictable; only unpinned
    /// frames may be dropped from the replacer.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if let Some(info) = state.frames.remove(&frame_id) {
            assert!(
                info.is_evictable,
                "cannot remove non-evictable {frame_id} from replacer"
            );
            state.evictable_count -= 1;
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().evictable_count
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_k_replacer_empty() {
        let replacer = LruKReplacer::new(2, 10);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_k_replacer_infinite_distance_ties() {
        let replacer = LruKReplacer::new(2, 10);

        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(1), AccessType::Unknown);
        replacer.record_access(FrameId::new(2), AccessType::Unknown);

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);
        replacer.set_evictable(FrameId::new(2), true);
        assert_eq!(replacer.size(), 3);

        // All have a single access (+inf distance); the earliest access wins.
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_lru_k_replacer_infinite_beats_finite() {
        let replacer = LruKReplacer::new(2, 10);

        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(1), AccessType::Unknown);

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        // Frame 1 has fewer than k accesses, so it goes first.
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_lru_k_replacer_largest_k_distance() {
        let replacer = LruKReplacer::new(2, 10);

        for frame in 0..3u32 {
            replacer.record_access(FrameId::new(frame), AccessType::Unknown);
            replacer.record_access(FrameId::new(frame), AccessType::Unknown);
        }
        for frame in 0..3u32 {
            replacer.set_evictable(FrameId::new(frame), true);
        }

        // Frame 0's second-most-recent access is the oldest, giving it the
        // largest backward k-distance.
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_lru_k_replacer_non_evictable_is_skipped() {
        let replacer = LruKReplacer::new(2, 10);

        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(1), AccessType::Unknown);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_k_replacer_toggle_evictable() {
        let replacer = LruKReplacer::new(2, 10);

        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.size(), 1);

        replacer.set_evictable(FrameId::new(0), false);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);

        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_lru_k_replacer_remove() {
        let replacer = LruKReplacer::new(2, 10);

        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.size(), 1);

        replacer.remove(FrameId::new(0));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);

        // Removing an untracked frame is a no-op.
        replacer.remove(FrameId::new(5));
    }

    #[test]
    #[should_panic]
    fn test_lru_k_replacer_remove_pinned_panics() {
        let replacer = LruKReplacer::new(2, 10);
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.remove(FrameId::new(0));
    }

    #[test]
    #[should_panic]
    fn test_lru_k_replacer_record_access_out_of_range_panics() {
        let replacer = LruKReplacer::new(2, 4);
        replacer.record_access(FrameId::new(4), AccessType::Unknown);
    }
}
