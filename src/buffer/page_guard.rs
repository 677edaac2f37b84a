use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, Result, PAGE_SIZE};

use super::buffer_pool_manager::PoolState;
use super::lru_k_replacer::AccessType;
use super::FrameHeader;

/// Unpins the frame on guard drop. Runs under the buffer pool mutex so
/// the pin-to-zero transition and the evictability flip are atomic with
/// respect to concurrent guard acquisition.
fn release_pin(state: &PoolState, frame: &FrameHeader) {
    let _inner = state.inner.lock();
    if let Some(0) = frame.unpin() {
        state
            .replacer
            .record_access(frame.frame_id(), AccessType::Unknown);
        state.replacer.set_evictable(frame.frame_id(), true);
    }
}

/// RAII guard granting shared access to one page's bytes.
///
/// Holding the guard keeps the frame pinned and the frame latch held in
/// shared mode; any number of `ReadPageGuard`s for the same page may
/// coexist across threads. Dropping the guard releases the latch and the
/// pin.
pub struct ReadPageGuard {
    page_id: PageId,
    frame: Arc<FrameHeader>,
    state: Arc<PoolState>,
    /// Shared frame latch; `'static` is sound because `frame` keeps the
    /// lock alive for the guard's lifetime, and the latch is dropped
    /// before the frame reference.
    data_guard: Option<RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    pub(crate) fn new(page_id: PageId, frame: Arc<FrameHeader>, state: Arc<PoolState>) -> Self {
        let data_guard = unsafe {
            std::mem::transmute::<
                RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>>,
                RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>,
            >(frame.read_data())
        };

        Self {
            page_id,
            frame,
            state,
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    /// Writes the page's bytes through the disk scheduler and clears the
    /// dirty flag once the write has completed successfully.
    pub fn flush(&self) -> Result<()> {
        let mut snapshot = Box::new([0u8; PAGE_SIZE]);
        snapshot.copy_from_slice(self.data());
        self.state
            .disk_scheduler
            .schedule_write_sync(self.page_id, snapshot)?;
        self.frame.set_dirty(false);
        Ok(())
    }

    /// Explicitly drops this guard, releasing the latch and the pin.
    pub fn drop_guard(self) {
        drop(self);
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Release the frame latch before touching the buffer pool mutex.
        self.data_guard.take();
        release_pin(&self.state, &self.frame);
    }
}

/// RAII guard granting exclusive access to one page's bytes.
///
/// Exclusive against every other guard for the page. The frame is marked
/// dirty as soon as the guard is created so an eviction between
/// construction and drop can never lose writes.
pub struct WritePageGuard {
    page_id: PageId,
    frame: Arc<FrameHeader>,
    state: Arc<PoolState>,
    /// Exclusive frame latch; see `ReadPageGuard::data_guard` for the
    /// lifetime argument.
    data_guard: Option<RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl WritePageGuard {
    pub(crate) fn new(page_id: PageId, frame: Arc<FrameHeader>, state: Arc<PoolState>) -> Self {
        let data_guard = unsafe {
            std::mem::transmute::<
                RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>>,
                RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>,
            >(frame.write_data())
        };

        frame.set_dirty(true);

        Self {
            page_id,
            frame,
            state,
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.frame.set_dirty(true);
        &mut self.data_guard.as_mut().unwrap()[..]
    }

    /// Writes the page's bytes through the disk scheduler and clears the
    /// dirty flag once the write has completed successfully.
    pub fn flush(&self) -> Result<()> {
        let mut snapshot = Box::new([0u8; PAGE_SIZE]);
        snapshot.copy_from_slice(self.data());
        self.state
            .disk_scheduler
            .schedule_write_sync(self.page_id, snapshot)?;
        self.frame.set_dirty(false);
        Ok(())
    }

    /// Explicitly drops this guard, releasing the latch and the pin.
    pub fn drop_guard(self) {
        drop(self);
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        // Release the frame latch before touching the buffer pool mutex.
        self.data_guard.take();
        release_pin(&self.state, &self.frame);
    }
}
