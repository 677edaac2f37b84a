//! Quarry - the storage and execution core of a disk-oriented RDBMS
//!
//! Data lives in 4 KiB pages on disk; a buffer pool caches pages in
//! memory and hands out RAII guards as the only access path to page
//! bytes. On top of the pool sit a concurrent B+Tree index, a table
//! heap, and a pull-based executor pipeline driven by compiled query
//! plans.
//!
//! # Architecture
//!
//! - **Storage** (`storage`): disk I/O and page organization
//!   - `DiskManager`: reads and writes pages in the database file
//!   - `DiskScheduler`: FIFO background worker serializing page I/O
//!   - `TablePage` / `TableHeap`: slotted tuple storage with tombstones
//!   - `SortPage`: scratch pages for external merge sort
//!
//! - **Buffer pool** (`buffer`): memory management for pages
//!   - `BufferPoolManager`: page table, page-id allocation, eviction
//!   - `LruKReplacer`: LRU-K replacement policy
//!   - `ReadPageGuard` / `WritePageGuard`: pinning rw-latched access
//!
//! - **Index** (`index`): concurrent unique-key B+Tree with latch
//!   crabbing and an ordered leaf-chain iterator
//!
//! - **Execution** (`execution`): expressions, plan nodes, and the
//!   pull-based executors (scans, joins, aggregation, external sort,
//!   DML)
//!
//! - **Optimizer** (`optimizer`): plan rewrites turning nested loop
//!   joins into hash joins and filtered sequential scans into index
//!   scans
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quarry::buffer::BufferPoolManager;
//! use quarry::storage::disk::DiskManager;
//!
//! let disk_manager = Arc::new(DiskManager::new("quarry.db").unwrap());
//! let bpm = BufferPoolManager::new(64, 2, disk_manager);
//!
//! let page_id = bpm.new_page();
//! {
//!     let mut guard = bpm.checked_write_page(page_id).unwrap().unwrap();
//!     guard.data_mut()[0] = 42;
//! }
//! bpm.flush_page(page_id).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod index;
pub mod optimizer;
pub mod storage;
pub mod tuple;

pub use common::{PageId, QuarryError, RecordId, Result, SlotId};
