//! Table heap storage and its forward iterator.

pub mod table_heap;

pub use table_heap::{TableHeap, TableIterator};
