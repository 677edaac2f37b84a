use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver as QueueReceiver, Sender as QueueSender};
use log::warn;

use crate::buffer::FrameHeader;
use crate::common::{PageId, QuarryError, Result, PAGE_SIZE};

use super::DiskManager;

/// Buffer carried by a disk request.
///
/// Reads target a live frame: the worker fills the frame's bytes under
/// its data latch. Writes carry an owned snapshot captured at schedule
/// time, so the scheduling thread is free to reuse or reset the frame
/// immediately; FIFO processing guarantees a later read of the same page
/// observes the written bytes.
pub enum RequestData {
    Frame(Arc<FrameHeader>),
    Owned(Box<[u8; PAGE_SIZE]>),
}

/// A single disk I/O request.
pub struct DiskRequest {
    /// Whether this is a write (true) or read (false) request
    pub is_write: bool,
    /// The buffer to fill (read) or drain (write)
    pub data: RequestData,
    /// The page to read/write
    pub page_id: PageId,
    /// Promise fulfilled with the outcome of the request
    pub callback: Sender<bool>,
}

impl DiskRequest {
    /// Creates a read request targeting the given frame's bytes.
    pub fn read(page_id: PageId, frame: Arc<FrameHeader>, callback: Sender<bool>) -> Self {
        Self {
            is_write: false,
            data: RequestData::Frame(frame),
            page_id,
            callback,
        }
    }

    /// Creates a write request from an owned snapshot of page bytes.
    pub fn write(page_id: PageId, bytes: Box<[u8; PAGE_SIZE]>, callback: Sender<bool>) -> Self {
        Self {
            is_write: true,
            data: RequestData::Owned(bytes),
            page_id,
            callback,
        }
    }
}

/// DiskScheduler serializes page I/O through a single background worker.
/// Requests are processed strictly in FIFO order, one at a time, so two
/// requests for the same page are ordered by enqueue order. Completion is
/// signalled through the per-request promise; an I/O failure fulfils the
/// promise with `false` and never brings the worker down.
pub struct DiskScheduler {
    disk_manager: Arc<DiskManager>,
    /// Request queue; `None` is the shutdown sentinel.
    request_sender: QueueSender<Option<DiskRequest>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a new scheduler and spawns its worker thread.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = unbounded::<Option<DiskRequest>>();

        let dm = Arc::clone(&disk_manager);
        let worker_handle = thread::spawn(move || {
            Self::worker_loop(dm, receiver);
        });

        Self {
            disk_manager,
            request_sender: sender,
            worker_handle: Some(worker_handle),
        }
    }

    /// Produces a fresh completion promise to attach to a request.
    /// The sender side goes into the request; the caller keeps the
    /// receiver and blocks on it to await completion.
    pub fn create_promise() -> (Sender<bool>, Receiver<bool>) {
        std::sync::mpsc::channel()
    }

    /// Enqueues a request for the background worker.
    pub fn schedule(&self, request: DiskRequest) -> Result<()> {
        self.request_sender
            .send(Some(request))
            .map_err(|e| QuarryError::DiskScheduler(format!("failed to schedule request: {e}")))
    }

    /// Schedules a write of the given bytes and waits for completion.
    pub fn schedule_write_sync(&self, page_id: PageId, bytes: Box<[u8; PAGE_SIZE]>) -> Result<()> {
        let (tx, rx) = Self::create_promise();
        self.schedule(DiskRequest::write(page_id, bytes, tx))?;

        let ok = rx.recv().map_err(|e| {
            QuarryError::DiskScheduler(format!("failed to receive completion: {e}"))
        })?;
        if !ok {
            return Err(QuarryError::DiskRequestFailed(page_id));
        }
        Ok(())
    }

    /// Forwards a page deallocation to the disk manager.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        self.disk_manager.deallocate_page(page_id)
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }

    fn worker_loop(disk_manager: Arc<DiskManager>, receiver: QueueReceiver<Option<DiskRequest>>) {
        while let Ok(message) = receiver.recv() {
            match message {
                Some(request) => Self::process_request(&disk_manager, request),
                None => break,
            }
        }
    }

    fn process_request(disk_manager: &DiskManager, request: DiskRequest) {
        let success = match (request.is_write, &request.data) {
            (true, RequestData::Owned(bytes)) => disk_manager
                .write_page(request.page_id, &bytes[..])
                .is_ok(),
            (true, RequestData::Frame(frame)) => {
                let data = frame.read_data();
                disk_manager.write_page(request.page_id, &data[..]).is_ok()
            }
            (false, RequestData::Frame(frame)) => {
                let mut data = frame.write_data();
                disk_manager
                    .read_page(request.page_id, &mut data[..])
                    .is_ok()
            }
            (false, RequestData::Owned(_)) => {
                warn!("dropping read request for {} with no destination frame", request.page_id);
                false
            }
        };

        // The receiver may already be gone (fire-and-forget writes).
        let _ = request.callback.send(success);
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.request_sender.send(None);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disk_scheduler_write_then_read() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(Arc::clone(&dm));

        let page_id = PageId::new(0);
        let mut bytes = Box::new([0u8; PAGE_SIZE]);
        bytes[0] = 42;
        bytes[100] = 255;
        scheduler.schedule_write_sync(page_id, bytes).unwrap();

        let mut read_back = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut read_back).unwrap();
        assert_eq!(read_back[0], 42);
        assert_eq!(read_back[100], 255);
    }

    #[test]
    fn test_disk_scheduler_fifo_same_page() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(Arc::clone(&dm));

        let page_id = PageId::new(0);

        // Queue several writes to the same page without waiting; the last
        // enqueued write must win.
        let mut receivers = Vec::new();
        for value in 1..=5u8 {
            let mut bytes = Box::new([0u8; PAGE_SIZE]);
            bytes[0] = value;
            let (tx, rx) = DiskScheduler::create_promise();
            scheduler
                .schedule(DiskRequest::write(page_id, bytes, tx))
                .unwrap();
            receivers.push(rx);
        }
        for rx in receivers {
            assert!(rx.recv().unwrap());
        }

        let mut read_back = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut read_back).unwrap();
        assert_eq!(read_back[0], 5);
    }

    #[test]
    fn test_disk_scheduler_shutdown_joins_worker() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(dm);

        let mut bytes = Box::new([0u8; PAGE_SIZE]);
        bytes[0] = 9;
        scheduler.schedule_write_sync(PageId::new(1), bytes).unwrap();

        // Drop must send the sentinel and join without hanging.
        drop(scheduler);
    }
}
