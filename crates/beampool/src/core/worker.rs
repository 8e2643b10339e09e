//! Module for owning long-lived decode workers.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use tokio::task::JoinHandle;

/// A handle for a worker task pulling requests off the dispatch queue.
///
/// The orchestrator is the only owner of these handles and the only party
/// that starts or stops a worker.
///
/// # Example
///
/// ```ignore
/// let worker = WorkerHandle::new(0, |running| {
///     tokio::spawn(async move {
///         while running.load(Ordering::SeqCst) {
///             // pull and decode one request
///         }
///     })
/// });
///
/// // Worker is aborted when dropped
/// ```
pub struct WorkerHandle {
    /// Position of this worker in the pool, used in logs
    id: usize,

    /// Flag indicating whether the worker should keep pulling requests
    running: Arc<AtomicBool>,

    /// Handle to the spawned task, becomes `None` after shutdown is initiated
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Creates a new `WorkerHandle` by spawning a worker task.
    ///
    /// # Parameters
    ///
    /// * `id` - Position of the worker in the pool
    /// * `task` - Spawns the worker loop given its running flag
    pub fn new<F>(id: usize, task: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> JoinHandle<()>,
    {
        let running = Arc::new(AtomicBool::new(true));
        let handle = task(running.clone());

        Self {
            id,
            running,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the worker has been neither stopped nor finished on its own.
    pub fn is_alive(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the worker immediately.
    ///
    /// This method:
    /// 1. Sets the running flag to `false`
    /// 2. Aborts the task. A beam search already running on the blocking pool
    ///    finishes, and its result is dropped
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Stops the worker and waits until its task is gone.
    pub async fn terminate(mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Cancelled or panicked, either way the worker is gone.
            let _ = handle.await;
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
