use thiserror::Error;

use super::types::{Oid, PageId};

/// Database error types
#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Buffer pool is full, no evictable frames available")]
    BufferPoolFull,

    #[error("Disk request for page {0} failed")]
    DiskRequestFailed(PageId),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Tuple of {tuple_size} bytes does not fit in {available} bytes of free space")]
    PageOverflow { tuple_size: usize, available: usize },

    #[error("Invalid slot {0}")]
    InvalidSlot(u16),

    #[error("Table {0} not found")]
    TableNotFound(Oid),

    #[error("Index {0} not found")]
    IndexNotFound(Oid),

    #[error("Value cannot be serialized as {0}")]
    TypeMismatch(String),

    #[error("Join type not supported: {0}")]
    UnsupportedJoinType(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, QuarryError>;
