use crate::common::PAGE_SIZE;

/// Scratch page for external merge sort.
///
/// Layout: header `{tuple_count, tuple_size, max_tuple_count}` (three
/// u32 fields) followed by a tightly packed array of fixed-size tuples.
/// `max_tuple_count` is derived from the tuple size at init time.
const HEADER_SIZE: usize = 12;

const TUPLE_COUNT_OFFSET: usize = 0;
const TUPLE_SIZE_OFFSET: usize = 4;
const MAX_TUPLE_COUNT_OFFSET: usize = 8;

macro_rules! sort_page_getters {
    () => {
        pub fn tuple_count(&self) -> usize {
            u32::from_le_bytes(
                self.data[TUPLE_COUNT_OFFSET..TUPLE_COUNT_OFFSET + 4]
                    .try_into()
                    .unwrap(),
            ) as usize
        }

        pub fn tuple_size(&self) -> usize {
            u32::from_le_bytes(
                self.data[TUPLE_SIZE_OFFSET..TUPLE_SIZE_OFFSET + 4]
                    .try_into()
                    .unwrap(),
            ) as usize
        }

        pub fn max_tuple_count(&self) -> usize {
            u32::from_le_bytes(
                self.data[MAX_TUPLE_COUNT_OFFSET..MAX_TUPLE_COUNT_OFFSET + 4]
                    .try_into()
                    .unwrap(),
            ) as usize
        }

        pub fn is_full(&self) -> bool {
            self.tuple_count() >= self.max_tuple_count()
        }

        /// Bytes of the tuple at `index`; panics when out of range.
        pub fn tuple_bytes(&self, index: usize) -> &[u8] {
            assert!(index < self.tuple_count(), "tuple index out of range");
            let size = self.tuple_size();
            let offset = HEADER_SIZE + index * size;
            &self.data[offset..offset + size]
        }
    };
}

/// Mutable view over a sort page's bytes.
pub struct SortPage<'a> {
    data: &'a mut [u8],
}

impl<'a> SortPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    sort_page_getters!();

    /// Initializes an empty sort page for tuples of the given width.
    pub fn init(&mut self, tuple_size: usize) {
        assert!(tuple_size > 0 && tuple_size <= PAGE_SIZE - HEADER_SIZE);
        self.data.fill(0);
        self.data[TUPLE_SIZE_OFFSET..TUPLE_SIZE_OFFSET + 4]
            .copy_from_slice(&(tuple_size as u32).to_le_bytes());
        let max = (PAGE_SIZE - HEADER_SIZE) / tuple_size;
        self.data[MAX_TUPLE_COUNT_OFFSET..MAX_TUPLE_COUNT_OFFSET + 4]
            .copy_from_slice(&(max as u32).to_le_bytes());
    }

    fn set_tuple_count(&mut self, count: usize) {
        self.data[TUPLE_COUNT_OFFSET..TUPLE_COUNT_OFFSET + 4]
            .copy_from_slice(&(count as u32).to_le_bytes());
    }

    /// Appends a tuple; returns false when the page is full.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> bool {
        assert_eq!(tuple.len(), self.tuple_size());
        if self.is_full() {
            return false;
        }
        let count = self.tuple_count();
        let offset = HEADER_SIZE + count * tuple.len();
        self.data[offset..offset + tuple.len()].copy_from_slice(tuple);
        self.set_tuple_count(count + 1);
        true
    }

    /// Replaces the page's tuples with an already-sorted batch.
    pub fn overwrite_with(&mut self, tuples: &[Vec<u8>]) {
        assert!(tuples.len() <= self.max_tuple_count());
        let size = self.tuple_size();
        for (i, tuple) in tuples.iter().enumerate() {
            assert_eq!(tuple.len(), size);
            let offset = HEADER_SIZE + i * size;
            self.data[offset..offset + size].copy_from_slice(tuple);
        }
        self.set_tuple_count(tuples.len());
    }
}

/// Read-only view over a sort page's bytes.
pub struct SortPageRef<'a> {
    data: &'a [u8],
}

impl<'a> SortPageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    sort_page_getters!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_page_capacity() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SortPage::new(&mut data);
        page.init(100);

        assert_eq!(page.max_tuple_count(), (PAGE_SIZE - HEADER_SIZE) / 100);
        assert_eq!(page.tuple_count(), 0);
        assert!(!page.is_full());
    }

    #[test]
    fn test_sort_page_insert_until_full() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SortPage::new(&mut data);
        page.init(2000);

        assert!(page.insert_tuple(&[1u8; 2000]));
        assert!(page.insert_tuple(&[2u8; 2000]));
        assert!(page.is_full());
        assert!(!page.insert_tuple(&[3u8; 2000]));

        assert_eq!(page.tuple_bytes(0)[0], 1);
        assert_eq!(page.tuple_bytes(1)[0], 2);
    }

    #[test]
    fn test_sort_page_overwrite_with() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SortPage::new(&mut data);
        page.init(8);
        page.insert_tuple(&[9u8; 8]);

        page.overwrite_with(&[vec![1u8; 8], vec![2u8; 8], vec![3u8; 8]]);
        assert_eq!(page.tuple_count(), 3);
        assert_eq!(page.tuple_bytes(2)[0], 3);
    }
}
