use std::sync::Arc;

use crate::buffer::{BufferPoolManager, ReadPageGuard};
use crate::common::{QuarryError, RecordId, Result};

use super::btree_page::LeafPageRef;

/// Ordered forward iterator over a B+Tree's `(key, value)` pairs.
///
/// The iterator holds a read guard on its current leaf, so the leaf
/// cannot be evicted or mutated underneath it; stepping to the next leaf
/// latches the successor before the current guard is released. The end
/// state holds no guard.
pub struct BPlusTreeIterator {
    bpm: Arc<BufferPoolManager>,
    guard: Option<ReadPageGuard>,
    index: usize,
}

impl BPlusTreeIterator {
    pub(crate) fn new(
        bpm: Arc<BufferPoolManager>,
        guard: ReadPageGuard,
        index: usize,
    ) -> Result<Self> {
        let mut iterator = Self {
            bpm,
            guard: Some(guard),
            index,
        };
        iterator.advance_past_exhausted_leaves()?;
        Ok(iterator)
    }

    pub(crate) fn end(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            guard: None,
            index: 0,
        }
    }

    pub fn is_end(&self) -> bool {
        self.guard.is_none()
    }

    /// Follows the sibling chain while the current position is past the
    /// end of its leaf; becomes the end iterator when the chain runs out.
    ///
    /// The current guard is released before the successor is latched.
    /// Deletions latch a leaf and then its left sibling, so an iterator
    /// holding a leaf while waiting on the next one could close a latch
    /// cycle with a concurrent remove.
    fn advance_past_exhausted_leaves(&mut self) -> Result<()> {
        while let Some(guard) = &self.guard {
            let leaf = LeafPageRef::new(guard.data());
            if self.index < leaf.size() {
                return Ok(());
            }
            let next = leaf.next_page_id();
            self.guard = None;
            if !next.is_valid() {
                return Ok(());
            }
            let next_guard = self
                .bpm
                .checked_read_page(next)?
                .ok_or(QuarryError::BufferPoolFull)?;
            self.guard = Some(next_guard);
            self.index = 0;
        }
        Ok(())
    }
}

impl Iterator for BPlusTreeIterator {
    type Item = Result<(i64, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        let guard = self.guard.as_ref()?;
        let leaf = LeafPageRef::new(guard.data());
        let entry = (leaf.key_at(self.index), leaf.value_at(self.index));
        self.index += 1;

        if let Err(e) = self.advance_past_exhausted_leaves() {
            self.guard = None;
            return Some(Err(e));
        }
        Some(Ok(entry))
    }
}
