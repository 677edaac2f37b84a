//! Buffer pool: frames, page guards, LRU-K replacement, and the manager.

pub mod buffer_pool_manager;
pub mod frame_header;
pub mod lru_k_replacer;
pub mod page_guard;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame_header::FrameHeader;
pub use lru_k_replacer::{AccessType, LruKReplacer};
pub use page_guard::{ReadPageGuard, WritePageGuard};
