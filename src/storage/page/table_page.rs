use crate::common::{PageId, SlotId, INVALID_PAGE_ID, PAGE_SIZE};

/// Slotted table page layout:
///
/// +--------------------+
/// | Header             |  next_page_id (4) | num_tuples (2) | num_deleted (2)
/// +--------------------+
/// | Slot array         |  grows downward; one entry per tuple
/// | [slot 0]           |  offset (2) | size (2) | deleted flag (2)
/// | ...                |
/// +--------------------+
/// | Free space         |
/// +--------------------+
/// | Tuple data         |  grows upward from the end of the page
/// +--------------------+
///
/// Deleting a tuple only sets its tombstone flag; the bytes stay in
/// place so record ids remain stable.
const HEADER_SIZE: usize = 8;
const SLOT_SIZE: usize = 6;

const NEXT_PAGE_OFFSET: usize = 0;
const NUM_TUPLES_OFFSET: usize = 4;
const NUM_DELETED_OFFSET: usize = 6;

macro_rules! table_page_getters {
    () => {
        /// Page id of the next table page in the heap's linked list.
        pub fn next_page_id(&self) -> PageId {
            PageId::new(i32::from_le_bytes(
                self.data[NEXT_PAGE_OFFSET..NEXT_PAGE_OFFSET + 4]
                    .try_into()
                    .unwrap(),
            ))
        }

        pub fn num_tuples(&self) -> u16 {
            u16::from_le_bytes(
                self.data[NUM_TUPLES_OFFSET..NUM_TUPLES_OFFSET + 2]
                    .try_into()
                    .unwrap(),
            )
        }

        pub fn num_deleted(&self) -> u16 {
            u16::from_le_bytes(
                self.data[NUM_DELETED_OFFSET..NUM_DELETED_OFFSET + 2]
                    .try_into()
                    .unwrap(),
            )
        }

        fn slot(&self, index: usize) -> (u16, u16, bool) {
            let base = HEADER_SIZE + index * SLOT_SIZE;
            let offset = u16::from_le_bytes(self.data[base..base + 2].try_into().unwrap());
            let size = u16::from_le_bytes(self.data[base + 2..base + 4].try_into().unwrap());
            let deleted = u16::from_le_bytes(self.data[base + 4..base + 6].try_into().unwrap()) != 0;
            (offset, size, deleted)
        }

        /// Returns the tuple bytes and tombstone flag for a slot, or
        /// `None` when the slot does not exist.
        pub fn get_tuple(&self, slot_id: SlotId) -> Option<(&[u8], bool)> {
            let index = slot_id.as_u16() as usize;
            if index >= self.num_tuples() as usize {
                return None;
            }
            let (offset, size, deleted) = self.slot(index);
            Some((
                &self.data[offset as usize..offset as usize + size as usize],
                deleted,
            ))
        }

        pub fn is_deleted(&self, slot_id: SlotId) -> Option<bool> {
            let index = slot_id.as_u16() as usize;
            if index >= self.num_tuples() as usize {
                return None;
            }
            Some(self.slot(index).2)
        }

        /// Bytes available for one more tuple plus its slot entry.
        pub fn free_space(&self) -> usize {
            let num_tuples = self.num_tuples() as usize;
            let free_end = if num_tuples == 0 {
                PAGE_SIZE
            } else {
                self.slot(num_tuples - 1).0 as usize
            };
            let free_start = HEADER_SIZE + num_tuples * SLOT_SIZE;
            free_end.saturating_sub(free_start)
        }
    };
}

/// Mutable view over a table page's bytes.
pub struct TablePage<'a> {
    data: &'a mut [u8],
}

impl<'a> TablePage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    table_page_getters!();

    /// Initializes a fresh table page.
    pub fn init(&mut self) {
        self.data.fill(0);
        self.set_next_page_id(INVALID_PAGE_ID);
    }

    pub fn set_next_page_id(&mut self, page_id: PageId) {
        self.data[NEXT_PAGE_OFFSET..NEXT_PAGE_OFFSET + 4]
            .copy_from_slice(&page_id.as_i32().to_le_bytes());
    }

    fn set_num_tuples(&mut self, num: u16) {
        self.data[NUM_TUPLES_OFFSET..NUM_TUPLES_OFFSET + 2].copy_from_slice(&num.to_le_bytes());
    }

    fn set_num_deleted(&mut self, num: u16) {
        self.data[NUM_DELETED_OFFSET..NUM_DELETED_OFFSET + 2].copy_from_slice(&num.to_le_bytes());
    }

    fn set_slot(&mut self, index: usize, offset: u16, size: u16, deleted: bool) {
        let base = HEADER_SIZE + index * SLOT_SIZE;
        self.data[base..base + 2].copy_from_slice(&offset.to_le_bytes());
        self.data[base + 2..base + 4].copy_from_slice(&size.to_le_bytes());
        self.data[base + 4..base + 6].copy_from_slice(&(deleted as u16).to_le_bytes());
    }

    /// Appends a tuple, returning its slot, or `None` when the page is
    /// out of room.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> Option<SlotId> {
        if self.free_space() < SLOT_SIZE + tuple.len() {
            return None;
        }

        let num_tuples = self.num_tuples() as usize;
        let free_end = if num_tuples == 0 {
            PAGE_SIZE
        } else {
            self.slot(num_tuples - 1).0 as usize
        };

        let offset = free_end - tuple.len();
        self.data[offset..offset + tuple.len()].copy_from_slice(tuple);
        self.set_slot(num_tuples, offset as u16, tuple.len() as u16, false);
        self.set_num_tuples(num_tuples as u16 + 1);

        Some(SlotId::new(num_tuples as u16))
    }

    /// Sets or clears a tuple's tombstone. Returns `false` when the slot
    /// does not exist.
    pub fn set_deleted(&mut self, slot_id: SlotId, deleted: bool) -> bool {
        let index = slot_id.as_u16() as usize;
        if index >= self.num_tuples() as usize {
            return false;
        }
        let (offset, size, was_deleted) = self.slot(index);
        if was_deleted != deleted {
            self.set_slot(index, offset, size, deleted);
            let delta = if deleted { 1 } else { u16::MAX };
            self.set_num_deleted(self.num_deleted().wrapping_add(delta));
        }
        true
    }

    /// Overwrites a tuple's bytes in place. The replacement must have the
    /// same length (fixed-width tuples always do).
    pub fn overwrite_tuple(&mut self, slot_id: SlotId, tuple: &[u8]) -> bool {
        let index = slot_id.as_u16() as usize;
        if index >= self.num_tuples() as usize {
            return false;
        }
        let (offset, size, _) = self.slot(index);
        if size as usize != tuple.len() {
            return false;
        }
        self.data[offset as usize..offset as usize + tuple.len()].copy_from_slice(tuple);
        true
    }
}

/// Read-only view over a table page's bytes.
pub struct TablePageRef<'a> {
    data: &'a [u8],
}

impl<'a> TablePageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    table_page_getters!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_page_insert_and_get() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = TablePage::new(&mut data);
        page.init();

        assert_eq!(page.next_page_id(), INVALID_PAGE_ID);

        let s0 = page.insert_tuple(b"hello").unwrap();
        let s1 = page.insert_tuple(b"world!").unwrap();
        assert_eq!(s0, SlotId::new(0));
        assert_eq!(s1, SlotId::new(1));
        assert_eq!(page.num_tuples(), 2);

        assert_eq!(page.get_tuple(s0).unwrap(), (b"hello".as_slice(), false));
        assert_eq!(page.get_tuple(s1).unwrap(), (b"world!".as_slice(), false));
        assert!(page.get_tuple(SlotId::new(2)).is_none());
    }

    #[test]
    fn test_table_page_tombstone() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = TablePage::new(&mut data);
        page.init();

        let slot = page.insert_tuple(b"doomed").unwrap();
        assert!(page.set_deleted(slot, true));
        assert_eq!(page.num_deleted(), 1);
        assert_eq!(page.get_tuple(slot).unwrap().1, true);

        // Undelete restores the tuple.
        assert!(page.set_deleted(slot, false));
        assert_eq!(page.num_deleted(), 0);
        assert_eq!(page.get_tuple(slot).unwrap(), (b"doomed".as_slice(), false));

        assert!(!page.set_deleted(SlotId::new(9), true));
    }

    #[test]
    fn test_table_page_fills_up() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = TablePage::new(&mut data);
        page.init();

        let tuple = [7u8; 100];
        let mut inserted = 0;
        while page.insert_tuple(&tuple).is_some() {
            inserted += 1;
        }

        // 4088 usable bytes, 106 per tuple.
        assert_eq!(inserted, (PAGE_SIZE - HEADER_SIZE) / (SLOT_SIZE + 100));
        assert!(page.free_space() < SLOT_SIZE + 100);
    }

    #[test]
    fn test_table_page_ref_view_matches() {
        let mut data = [0u8; PAGE_SIZE];
        {
            let mut page = TablePage::new(&mut data);
            page.init();
            page.insert_tuple(b"abc").unwrap();
        }

        let page = TablePageRef::new(&data);
        assert_eq!(page.num_tuples(), 1);
        assert_eq!(
            page.get_tuple(SlotId::new(0)).unwrap(),
            (b"abc".as_slice(), false)
        );
    }
}
