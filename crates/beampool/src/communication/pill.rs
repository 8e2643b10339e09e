use std::thread;

use tokio::sync::mpsc::UnboundedSender;
use tracing::error;

use super::WorkerResult;

/// # FailureGuard
///
/// A poison pill that turns a panicking worker into a failure sentinel on the
/// result queue.
///
/// ## Purpose
///
/// The collector waits for exactly one result per request. If a worker panics
/// mid-decode, that result never arrives and the collector would wait forever.
/// Each worker owns a `FailureGuard`; when the guard is dropped during unwinding
/// it writes [`WorkerResult::Failed`] so the collector can abort the run.
///
/// ## Implementation Strategy
///
/// `FailureGuard` relies on `Drop` and `thread::panicking()`. A normal drop
/// (worker exits its loop) sends nothing.
pub(crate) struct FailureGuard<T> {
    worker_id: usize,
    results: UnboundedSender<WorkerResult<T>>,
}

impl<T> FailureGuard<T> {
    pub fn new(worker_id: usize, results: UnboundedSender<WorkerResult<T>>) -> Self {
        Self { worker_id, results }
    }
}

impl<T> Drop for FailureGuard<T> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker_id = self.worker_id, "worker panicked while decoding");
            // The collector may already be gone; nothing left to tell then.
            let _ = self
                .results
                .send(WorkerResult::Failed(format!("worker {} panicked", self.worker_id)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_guard_is_silent_on_normal_drop() {
        let (tx, mut rx) = unbounded_channel::<WorkerResult<u32>>();
        {
            let _guard = FailureGuard::new(0, tx);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_guard_reports_panic() {
        let (tx, mut rx) = unbounded_channel::<WorkerResult<u32>>();

        let handle = thread::spawn(move || {
            let _guard = FailureGuard::new(7, tx);
            panic!("Intentional panic in worker");
        });

        assert!(handle.join().is_err(), "Thread should have panicked");
        match rx.try_recv() {
            Ok(WorkerResult::Failed(reason)) => assert!(reason.contains("worker 7")),
            other => panic!("expected a failure sentinel, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_tolerates_closed_queue() {
        let (tx, rx) = unbounded_channel::<WorkerResult<u32>>();
        drop(rx);

        let handle = thread::spawn(move || {
            let _guard = FailureGuard::new(1, tx);
            panic!("Intentional panic with nobody listening");
        });

        // The guard itself must not double panic.
        assert!(handle.join().is_err());
    }

    #[test]
    fn test_guard_usage_in_typical_pattern() {
        let (tx, mut rx) = unbounded_channel::<WorkerResult<&str>>();

        let worker = thread::spawn(move || {
            let _guard = FailureGuard::new(2, tx.clone());
            tx.send(WorkerResult::Ok("done")).unwrap();
        });

        worker.join().unwrap();
        assert_eq!(rx.try_recv().unwrap(), WorkerResult::Ok("done"));
        assert!(rx.try_recv().is_err());
    }
}
