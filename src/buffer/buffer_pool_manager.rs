use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};

use crate::common::{FrameId, PageId, QuarryError, Result, INVALID_PAGE_ID};
use crate::storage::disk::{DiskManager, DiskRequest, DiskScheduler};

use super::lru_k_replacer::AccessType;
use super::{FrameHeader, LruKReplacer, ReadPageGuard, WritePageGuard};

/// Bookkeeping protected by the buffer pool mutex.
pub(crate) struct PoolInner {
    /// Maps resident pages to their frames
    pub(crate) page_table: HashMap<PageId, FrameId>,
    /// Frames with no resident page
    pub(crate) free_list: VecDeque<FrameId>,
}

/// State shared between the buffer pool manager and its page guards.
pub(crate) struct PoolState {
    pub(crate) frames: Vec<Arc<FrameHeader>>,
    pub(crate) inner: Mutex<PoolInner>,
    pub(crate) replacer: LruKReplacer,
    pub(crate) disk_scheduler: DiskScheduler,
}

/// BufferPoolManager caches disk pages in a fixed set of in-memory
/// frames. Page data is only reachable through RAII page guards; the
/// manager tracks residency in a page table, hands out fresh page ids
/// from a monotonic counter, and evicts cold pages with an LRU-K policy
/// when every frame is occupied.
///
/// Locking: a single pool mutex protects the page table, the free list,
/// and all frame state transitions. Page bytes are guarded separately by
/// per-frame latches, and the mutex is never held while one of those
/// latches is being acquired.
pub struct BufferPoolManager {
    num_frames: usize,
    /// Monotonic page id allocator
    next_page_id: AtomicI32,
    state: Arc<PoolState>,
}

impl BufferPoolManager {
    /// Creates a buffer pool with `num_frames` frames and an LRU-K
    /// replacer with the given `k`. Page-id allocation resumes after the
    /// pages already present in the database file.
    pub fn new(num_frames: usize, k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let next_page_id = disk_manager.num_pages() as i32;
        let mut frames = Vec::with_capacity(num_frames);
        let mut free_list = VecDeque::with_capacity(num_frames);

        for i in 0..num_frames {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        let state = Arc::new(PoolState {
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::with_capacity(num_frames),
                free_list,
            }),
            replacer: LruKReplacer::new(k, num_frames),
            disk_scheduler: DiskScheduler::new(disk_manager),
        });

        Self {
            num_frames,
            next_page_id: AtomicI32::new(next_page_id),
            state,
        }
    }

    /// Number of frames this pool manages.
    pub fn size(&self) -> usize {
        self.num_frames
    }

    /// Allocates a fresh page id and installs the (zeroed) page in a
    /// frame. The new page starts out unpinned and evictable; acquire a
    /// guard to pin it. Nothing reaches disk until the page is flushed or
    /// evicted.
    ///
    /// Returns `INVALID_PAGE_ID` when every frame is pinned.
    pub fn new_page(&self) -> PageId {
        let mut inner = self.state.inner.lock();

        let frame_id = match self.acquire_frame(&mut inner) {
            Some(frame_id) => frame_id,
            None => return INVALID_PAGE_ID,
        };

        let page_id = PageId::new(self.next_page_id.fetch_add(1, Ordering::SeqCst));
        let frame = &self.state.frames[frame_id.as_usize()];
        frame.set_page_id(page_id);

        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id, AccessType::Unknown);
        self.state.replacer.set_evictable(frame_id, true);

        trace!("allocated {page_id} in {frame_id}");
        page_id
    }

    /// Drops a page from the pool and recycles its disk space.
    ///
    /// Unmapped pages report success (the operation is idempotent);
    /// pinned pages cannot be deleted and report `false`.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        if frame.is_dirty() {
            self.flush_frame(page_id, &frame)?;
        }

        inner.page_table.remove(&page_id);
        self.state.replacer.remove(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);

        self.state.disk_scheduler.deallocate_page(page_id)?;
        Ok(true)
    }

    /// Acquires a shared guard over the page's bytes, faulting the page
    /// in from disk if necessary.
    ///
    /// Returns `Ok(None)` when no frame can be freed for a faulting read
    /// (every frame pinned), and an error for ids that were never
    /// allocated.
    pub fn checked_read_page(&self, page_id: PageId) -> Result<Option<ReadPageGuard>> {
        let frame = match self.pin_page(page_id)? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        Ok(Some(ReadPageGuard::new(
            page_id,
            frame,
            Arc::clone(&self.state),
        )))
    }

    /// Acquires an exclusive guard over the page's bytes, faulting the
    /// page in from disk if necessary.
    ///
    /// Returns `Ok(None)` when no frame can be freed for a faulting read
    /// (every frame pinned), and an error for ids that were never
    /// allocated.
    pub fn checked_write_page(&self, page_id: PageId) -> Result<Option<WritePageGuard>> {
        let frame = match self.pin_page(page_id)? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        Ok(Some(WritePageGuard::new(
            page_id,
            frame,
            Arc::clone(&self.state),
        )))
    }

    /// Infallible wrapper around [`checked_read_page`]; panics when the
    /// page cannot be brought in. Test and example use only.
    ///
    /// [`checked_read_page`]: BufferPoolManager::checked_read_page
    pub fn read_page(&self, page_id: PageId) -> ReadPageGuard {
        match self.checked_read_page(page_id) {
            Ok(Some(guard)) => guard,
            Ok(None) => panic!("checked_read_page failed to bring in {page_id}: page not found"),
            Err(e) => panic!("checked_read_page failed to bring in {page_id}: {e:?}"),
        }
    }

    /// Infallible wrapper around [`checked_write_page`]; panics when the
    /// page cannot be brought in. Test and example use only.
    ///
    /// [`checked_write_page`]: BufferPoolManager::checked_write_page
    pub fn write_page(&self, page_id: PageId) -> WritePageGuard {
        match self.checked_write_page(page_id) {
            Ok(Some(guard)) => guard,
            Ok(None) => panic!("checked_write_page failed to bring in {page_id}: page not found"),
            Err(e) => panic!("checked_write_page failed to bring in {page_id}: {e:?}"),
        }
    }

    /// Writes one resident page to disk if dirty and clears its dirty
    /// flag. Returns `Ok(false)` when the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Err(QuarryError::InvalidPageId(page_id));
        }

        let inner = self.state.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
        drop(inner);

        if frame.is_dirty() {
            self.flush_frame(page_id, &frame)?;
        }
        Ok(true)
    }

    /// Writes every dirty resident page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let inner = self.state.inner.lock();
        let resident: Vec<(PageId, FrameId)> =
            inner.page_table.iter().map(|(&p, &f)| (p, f)).collect();
        drop(inner);

        for (page_id, frame_id) in resident {
            let frame = &self.state.frames[frame_id.as_usize()];
            if frame.is_dirty() {
                self.flush_frame(page_id, frame)?;
            }
        }
        Ok(())
    }

    /// Current pin count of a resident page; `None` when not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<usize> {
        let inner = self.state.inner.lock();
        inner
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].pin_count() as usize)
    }

    /// Number of frames with no resident page.
    pub fn free_frame_count(&self) -> usize {
        self.state.inner.lock().free_list.len()
    }

    /// Pins the page into a frame, recording the access and marking the
    /// frame non-evictable, faulting the page in on a miss. The returned
    /// frame has the caller's pin already counted; the caller latches it
    /// after this returns (with the pool mutex released).
    fn pin_page(&self, page_id: PageId) -> Result<Option<Arc<FrameHeader>>> {
        if !page_id.is_valid() || page_id.as_i32() >= self.next_page_id.load(Ordering::SeqCst) {
            return Err(QuarryError::InvalidPageId(page_id));
        }

        let mut inner = self.state.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
            frame.pin();
            self.state.replacer.record_access(frame_id, AccessType::Unknown);
            self.state.replacer.set_evictable(frame_id, false);
            return Ok(Some(frame));
        }

        // Miss: bring the page in from disk.
        let Some(frame_id) = self.acquire_frame(&mut inner) else {
            return Ok(None);
        };
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
        frame.set_page_id(page_id);
        frame.pin();

        // Install the mapping before waiting so a concurrent caller finds
        // the pinned frame instead of evicting it mid-read.
        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id, AccessType::Unknown);
        self.state.replacer.set_evictable(frame_id, false);

        let (tx, rx) = DiskScheduler::create_promise();
        self.state
            .disk_scheduler
            .schedule(DiskRequest::read(page_id, Arc::clone(&frame), tx))?;
        drop(inner);

        let success = rx.recv().unwrap_or(false);
        if !success {
            // Undo the mapping so the frame is not leaked.
            let mut inner = self.state.inner.lock();
            inner.page_table.remove(&page_id);
            frame.reset();
            self.state.replacer.set_evictable(frame_id, true);
            self.state.replacer.remove(frame_id);
            inner.free_list.push_back(frame_id);
            return Err(QuarryError::DiskRequestFailed(page_id));
        }

        Ok(Some(frame))
    }

    /// Obtains a frame for a new resident page: the free list first, then
    /// an LRU-K victim. A dirty victim's bytes are snapshotted and queued
    /// for writing; FIFO ordering in the disk scheduler guarantees any
    /// later read of the victim page observes that write. Must be called
    /// with the pool mutex held.
    fn acquire_frame(&self, inner: &mut MutexGuard<'_, PoolInner>) -> Option<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.state.replacer.evict()?;
        let frame = &self.state.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();
        debug!("evicting {old_page_id} from {frame_id}");

        if frame.is_dirty() {
            let (tx, _rx) = DiskScheduler::create_promise();
            let request = DiskRequest::write(old_page_id, frame.snapshot(), tx);
            if self.state.disk_scheduler.schedule(request).is_err() {
                return None;
            }
        }

        inner.page_table.remove(&old_page_id);
        frame.reset();
        Some(frame_id)
    }

    /// Synchronously writes a frame's bytes and clears the dirty flag on
    /// success.
    fn flush_frame(&self, page_id: PageId, frame: &FrameHeader) -> Result<()> {
        self.state
            .disk_scheduler
            .schedule_write_sync(page_id, frame.snapshot())?;
        frame.set_dirty(false);
        Ok(())
    }
}
