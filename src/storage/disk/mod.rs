//! Disk I/O: the page-granular disk manager and the FIFO disk scheduler.

pub mod disk_manager;
pub mod disk_scheduler;

pub use disk_manager::DiskManager;
pub use disk_scheduler::{DiskRequest, DiskScheduler, RequestData};
