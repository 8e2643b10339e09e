use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use super::handler::RequestHandler;
use super::worker::WorkerHandle;
use crate::communication::{FailureGuard, WorkerResult};

/// Shared consumer end of the dispatch queue.
pub type DispatchQueue<T> = Arc<Mutex<UnboundedReceiver<T>>>;

/// Body of a single worker.
///
/// Pulls one request at a time, hands it to `handler` and writes exactly one
/// result back. Returns when the running flag clears, the dispatch queue is
/// closed and drained, the result queue is gone, or after reporting a failure.
pub async fn worker_loop<H: RequestHandler>(
    worker_id: usize,
    handler: &H,
    running: Arc<AtomicBool>,
    requests: DispatchQueue<H::Request>,
    results: UnboundedSender<WorkerResult<H::Response>>,
) {
    let _guard = FailureGuard::new(worker_id, results.clone());

    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let request = {
            let mut queue = requests.lock().await;
            queue.recv().await
        };
        let Some(request) = request else {
            debug!(worker_id, "dispatch queue closed");
            break;
        };

        match handler.handle(request).await {
            Ok(response) => {
                if results.send(WorkerResult::Ok(response)).is_err() {
                    debug!(worker_id, "result queue closed");
                    break;
                }
            }
            Err(err) => {
                error!(worker_id, error = ?err, "decode failed: {err}");
                let _ = results.send(WorkerResult::Failed(format!("worker {worker_id}: {err}")));
                break;
            }
        }
    }
}

/// Spawns `count` workers sharing one handler and one dispatch queue.
pub fn spawn_workers<H>(
    count: usize,
    handler: Arc<H>,
    requests: DispatchQueue<H::Request>,
    results: UnboundedSender<WorkerResult<H::Response>>,
) -> Vec<WorkerHandle>
where
    H: RequestHandler + 'static,
    H::Request: 'static,
    H::Response: 'static,
{
    (0..count)
        .map(|worker_id| {
            let handler = handler.clone();
            let requests = requests.clone();
            let results = results.clone();
            WorkerHandle::new(worker_id, move |running| {
                tokio::spawn(async move {
                    worker_loop(worker_id, handler.as_ref(), running, requests, results).await;
                })
            })
        })
        .collect()
}
