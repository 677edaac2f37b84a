use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::BufferPoolManager;
use crate::common::{PageId, QuarryError, RecordId, Result, SlotId, PAGE_SIZE};
use crate::storage::page::{TablePage, TablePageRef};

/// Tuple storage over a singly linked list of slotted table pages.
///
/// Tuples are appended to the tail page; when it fills up a new page is
/// allocated and linked behind it. Deletion is a tombstone in the
/// owning page, so record ids stay stable for index entries.
pub struct TableHeap {
    bpm: Arc<BufferPoolManager>,
    first_page_id: PageId,
    /// Tail of the page list; appends go here.
    last_page_id: Mutex<PageId>,
}

impl TableHeap {
    /// Creates an empty heap with one table page.
    pub fn new(bpm: Arc<BufferPoolManager>) -> Result<Self> {
        let first_page_id = bpm.new_page();
        if !first_page_id.is_valid() {
            return Err(QuarryError::BufferPoolFull);
        }
        {
            let mut guard = bpm
                .checked_write_page(first_page_id)?
                .ok_or(QuarryError::BufferPoolFull)?;
            TablePage::new(guard.data_mut()).init();
        }

        Ok(Self {
            bpm,
            first_page_id,
            last_page_id: Mutex::new(first_page_id),
        })
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    /// Appends a serialized tuple and returns its record id.
    pub fn insert_tuple(&self, tuple: &[u8]) -> Result<RecordId> {
        // Page header plus one slot entry never leave more than this.
        if tuple.len() + 14 > PAGE_SIZE {
            return Err(QuarryError::PageOverflow {
                tuple_size: tuple.len(),
                available: PAGE_SIZE - 14,
            });
        }

        let mut last_page_id = self.last_page_id.lock();

        let mut guard = self
            .bpm
            .checked_write_page(*last_page_id)?
            .ok_or(QuarryError::BufferPoolFull)?;

        if let Some(slot) = TablePage::new(guard.data_mut()).insert_tuple(tuple) {
            return Ok(RecordId::new(*last_page_id, slot));
        }

        // Tail page is full: chain a fresh page behind it. The tail stays
        // pinned by our guard, so the allocation cannot evict it.
        let new_page_id = self.bpm.new_page();
        if !new_page_id.is_valid() {
            return Err(QuarryError::BufferPoolFull);
        }
        TablePage::new(guard.data_mut()).set_next_page_id(new_page_id);
        drop(guard);

        let mut new_guard = self
            .bpm
            .checked_write_page(new_page_id)?
            .ok_or(QuarryError::BufferPoolFull)?;
        let mut new_page = TablePage::new(new_guard.data_mut());
        new_page.init();
        let slot = new_page
            .insert_tuple(tuple)
            .expect("fresh table page must accept the tuple");

        *last_page_id = new_page_id;
        Ok(RecordId::new(new_page_id, slot))
    }

    /// Fetches a tuple's bytes and tombstone flag; `None` when the record
    /// id does not name an existing slot.
    pub fn get_tuple(&self, rid: RecordId) -> Result<Option<(Vec<u8>, bool)>> {
        let guard = self
            .bpm
            .checked_read_page(rid.page_id)?
            .ok_or(QuarryError::BufferPoolFull)?;
        let page = TablePageRef::new(guard.data());
        Ok(page
            .get_tuple(rid.slot)
            .map(|(bytes, deleted)| (bytes.to_vec(), deleted)))
    }

    /// Sets or clears a tuple's tombstone. Returns `false` when the
    /// record id does not name an existing slot.
    pub fn set_deleted(&self, rid: RecordId, deleted: bool) -> Result<bool> {
        let mut guard = self
            .bpm
            .checked_write_page(rid.page_id)?
            .ok_or(QuarryError::BufferPoolFull)?;
        Ok(TablePage::new(guard.data_mut()).set_deleted(rid.slot, deleted))
    }

    /// Forward iterator from the first slot of the first page.
    pub fn iter(&self) -> TableIterator {
        TableIterator {
            bpm: Arc::clone(&self.bpm),
            current_page_id: self.first_page_id,
            current_slot: 0,
        }
    }
}

/// Forward scan over every slot of a table heap, tombstoned or not;
/// callers decide whether to skip tombstones. The iterator holds no page
/// guard between calls.
pub struct TableIterator {
    bpm: Arc<BufferPoolManager>,
    current_page_id: PageId,
    current_slot: u16,
}

impl TableIterator {
    /// Returns the next `(record id, tuple bytes, tombstone)` triple, or
    /// `None` at the end of the heap.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<(RecordId, Vec<u8>, bool)>> {
        while self.current_page_id.is_valid() {
            let guard = self
                .bpm
                .checked_read_page(self.current_page_id)?
                .ok_or(QuarryError::BufferPoolFull)?;
            let page = TablePageRef::new(guard.data());

            if self.current_slot < page.num_tuples() {
                let slot = SlotId::new(self.current_slot);
                let rid = RecordId::new(self.current_page_id, slot);
                let (bytes, deleted) = page.get_tuple(slot).unwrap();
                let result = (rid, bytes.to_vec(), deleted);
                self.current_slot += 1;
                return Ok(Some(result));
            }

            self.current_page_id = page.next_page_id();
            self.current_slot = 0;
        }
        Ok(None)
    }
}
