use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::common::{PageId, QuarryError, Result, PAGE_SIZE};

use super::DiskManager;

/// A disk I/O request processed by the scheduler's worker thread.
///
/// Requests carry raw pointers into the caller's buffer; the synchronous
/// scheduling helpers below keep the buffer alive until the completion
/// callback fires.
pub enum DiskRequest {
    Read {
        page_id: PageId,
        data: *mut u8,
        callback: std::sync::mpsc::Sender<bool>,
    },
    Write {
        page_id: PageId,
        data: *const u8,
        callback: std::sync::mpsc::Sender<bool>,
    },
}

// Safety: the pointers are only dereferenced by the worker thread while the
// issuing thread blocks on the callback channel, so the buffer outlives the
// request.
unsafe impl Send for DiskRequest {}

/// DiskScheduler funnels page I/O through a single background worker thread,
/// decoupling callers from the disk manager's file cursor.
pub struct DiskScheduler {
    /// The disk manager for actual I/O operations
    disk_manager: Arc<DiskManager>,
    /// Channel sender for queuing requests
    request_sender: Sender<DiskRequest>,
    /// Flag to signal shutdown
    shutdown: Arc<AtomicBool>,
    /// Handle to the background worker thread
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a new DiskScheduler and spawns its worker thread.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = bounded::<DiskRequest>(128);
        let shutdown = Arc::new(AtomicBool::new(false));

        let dm = Arc::clone(&disk_manager);
        let shutdown_flag = Arc::clone(&shutdown);
        let worker_handle = thread::spawn(move || {
            Self::worker_loop(dm, receiver, shutdown_flag);
        });

        Self {
            disk_manager,
            request_sender: sender,
            shutdown,
            worker_handle: Some(worker_handle),
        }
    }

    /// Schedules a read request and blocks until it completes.
    pub fn schedule_read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = std::sync::mpsc::channel();
        self.schedule(DiskRequest::Read {
            page_id,
            data: data.as_mut_ptr(),
            callback: tx,
        })?;
        Self::wait(rx, page_id)
    }

    /// Schedules a write request and blocks until it completes.
    pub fn schedule_write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = std::sync::mpsc::channel();
        self.schedule(DiskRequest::Write {
            page_id,
            data: data.as_ptr(),
            callback: tx,
        })?;
        Self::wait(rx, page_id)
    }

    fn schedule(&self, request: DiskRequest) -> Result<()> {
        self.request_sender
            .send(request)
            .map_err(|e| QuarryError::DiskScheduler(format!("failed to queue request: {}", e)))
    }

    fn wait(rx: std::sync::mpsc::Receiver<bool>, page_id: PageId) -> Result<()> {
        match rx.recv() {
            Ok(true) => Ok(()),
            Ok(false) => Err(QuarryError::DiskScheduler(format!(
                "I/O on {} failed",
                page_id
            ))),
            Err(e) => Err(QuarryError::DiskScheduler(format!(
                "completion channel closed: {}",
                e
            ))),
        }
    }

    /// Worker thread body: drains requests until shutdown is signaled.
    fn worker_loop(
        disk_manager: Arc<DiskManager>,
        receiver: Receiver<DiskRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                while let Ok(request) = receiver.try_recv() {
                    Self::process(&disk_manager, request);
                }
                break;
            }

            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(request) => Self::process(&disk_manager, request),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process(disk_manager: &DiskManager, request: DiskRequest) {
        match request {
            DiskRequest::Read {
                page_id,
                data,
                callback,
            } => {
                // Safety: issuer blocks on `callback` with the buffer alive
                let buf = unsafe { std::slice::from_raw_parts_mut(data, PAGE_SIZE) };
                let _ = callback.send(disk_manager.read_page(page_id, buf).is_ok());
            }
            DiskRequest::Write {
                page_id,
                data,
                callback,
            } => {
                // Safety: issuer blocks on `callback` with the buffer alive
                let buf = unsafe { std::slice::from_raw_parts(data, PAGE_SIZE) };
                let _ = callback.send(disk_manager.write_page(page_id, buf).is_ok());
            }
        }
    }

    /// Returns a reference to the underlying DiskManager.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
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
    fn test_disk_scheduler_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(dm);

        let page_id = scheduler.disk_manager().allocate_page().unwrap();

        let mut write_data = [0u8; PAGE_SIZE];
        write_data[0] = 42;
        write_data[100] = 255;
        scheduler.schedule_write_sync(page_id, &write_data).unwrap();

        let mut read_data = [0u8; PAGE_SIZE];
        scheduler
            .schedule_read_sync(page_id, &mut read_data)
            .unwrap();

        assert_eq!(read_data[0], 42);
        assert_eq!(read_data[100], 255);
    }

    #[test]
    fn test_disk_scheduler_interleaved_requests() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let scheduler = DiskScheduler::new(dm);

        let page_id1 = scheduler.disk_manager().allocate_page().unwrap();
        let page_id2 = scheduler.disk_manager().allocate_page().unwrap();

        scheduler
            .schedule_write_sync(page_id1, &[1u8; PAGE_SIZE])
            .unwrap();
        scheduler
            .schedule_write_sync(page_id2, &[2u8; PAGE_SIZE])
            .unwrap();

        let mut read1 = [0u8; PAGE_SIZE];
        let mut read2 = [0u8; PAGE_SIZE];
        scheduler.schedule_read_sync(page_id1, &mut read1).unwrap();
        scheduler.schedule_read_sync(page_id2, &mut read2).unwrap();

        assert_eq!(read1[0], 1);
        assert_eq!(read2[0], 2);
    }
}
