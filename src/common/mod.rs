//! Shared types, constants, and error definitions.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    DEFAULT_BUFFER_POOL_SIZE, DEFAULT_INTERNAL_MAX_SIZE, DEFAULT_LEAF_MAX_SIZE, DEFAULT_LRUK_K,
    INVALID_FRAME_ID, INVALID_PAGE_ID, PAGE_SIZE,
};
pub use error::{QuarryError, Result};
pub use types::{FrameId, Oid, PageId, RecordId, SlotId, Timestamp};
