//! Reservation dispatcher: a fixed pool of workers draining one intake queue.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use lending_core::config::DispatcherConfig;
use lending_core::error::AppError;
use lending_core::types::id::{ItemId, MemberId};
use lending_registry::LibraryManager;

use crate::request::{ReplyReceiver, ReservationRequest};

/// Error from handing a request to the pool.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The pool has been closed and accepts no more requests.
    #[error("Reservation intake is closed")]
    IntakeClosed,
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::service_unavailable(err.to_string())
    }
}

/// Cloneable producer side of the intake queue.
#[derive(Debug, Clone)]
pub struct IntakeHandle {
    /// Sender half of the bounded intake channel.
    tx: mpsc::Sender<ReservationRequest>,
}

impl IntakeHandle {
    /// Enqueues a prepared request, waiting while the queue is full.
    pub async fn send(&self, request: ReservationRequest) -> Result<(), DispatchError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| DispatchError::IntakeClosed)
    }

    /// Enqueues a reservation attempt and returns where its outcome will arrive.
    pub async fn submit(
        &self,
        item_id: ItemId,
        member_id: MemberId,
    ) -> Result<ReplyReceiver, DispatchError> {
        let (request, reply) = ReservationRequest::new(item_id, member_id);
        self.send(request).await?;
        Ok(reply)
    }
}

/// Fixed-size pool of reservation workers.
///
/// Workers exit once the pool is closed and the queue is drained, or once
/// every producer handle is dropped. Waiting for them is optional.
#[derive(Debug)]
pub struct ReservationDispatcher {
    /// Producer side kept by the pool owner.
    intake: IntakeHandle,
    /// Signals workers to stop accepting and drain.
    closed: CancellationToken,
    /// Counts running workers.
    tracker: TaskTracker,
    /// Number of workers started.
    workers: usize,
}

impl ReservationDispatcher {
    /// Starts `config.workers` workers applying requests to `manager`.
    pub fn start(manager: Arc<dyn LibraryManager>, config: &DispatcherConfig) -> Self {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel(config.intake_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let closed = CancellationToken::new();
        let tracker = TaskTracker::new();

        for worker_id in 1..=workers {
            tracker.spawn(run_worker(
                worker_id,
                Arc::clone(&manager),
                Arc::clone(&rx),
                closed.clone(),
            ));
        }

        info!(
            workers,
            intake_capacity = config.intake_capacity,
            "Reservation dispatcher started"
        );

        Self {
            intake: IntakeHandle { tx },
            closed,
            tracker,
            workers,
        }
    }

    /// Returns a producer handle that can be moved into other tasks.
    pub fn intake(&self) -> IntakeHandle {
        self.intake.clone()
    }

    /// Enqueues a reservation attempt.
    pub async fn submit(
        &self,
        item_id: ItemId,
        member_id: MemberId,
    ) -> Result<ReplyReceiver, DispatchError> {
        self.intake.submit(item_id, member_id).await
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Check if [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Stops accepting requests. Queued requests are still processed.
    pub fn close(&self) {
        self.closed.cancel();
        self.tracker.close();
    }

    /// Waits until every worker has exited.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Closes the intake and waits for the pool to drain.
    pub async fn shutdown(self) {
        self.close();
        self.wait().await;
        info!(workers = self.workers, "Reservation dispatcher shut down");
    }
}

/// Worker loop: receive, reserve, reply.
async fn run_worker(
    worker_id: usize,
    manager: Arc<dyn LibraryManager>,
    intake: Arc<Mutex<mpsc::Receiver<ReservationRequest>>>,
    closed: CancellationToken,
) {
    debug!(worker_id, "Reservation worker started");

    loop {
        let next = {
            let mut rx = intake.lock().await;
            tokio::select! {
                biased;
                request = rx.recv() => request,
                _ = closed.cancelled() => {
                    // Closed receivers still yield buffered requests and
                    // those behind already-reserved send permits.
                    rx.close();
                    rx.recv().await
                }
            }
        };

        let Some(request) = next else {
            break;
        };
        process(worker_id, manager.as_ref(), request).await;
    }

    debug!(worker_id, "Reservation worker stopped");
}

/// Applies one request and hands the outcome to its reply slot.
async fn process(worker_id: usize, manager: &dyn LibraryManager, request: ReservationRequest) {
    let ReservationRequest {
        request_id,
        item_id,
        member_id,
        reply,
    } = request;

    let outcome = manager.reserve(item_id, member_id).await;

    match &outcome {
        Ok(()) => info!(
            worker_id,
            %request_id,
            item_id = %item_id,
            member_id = %member_id,
            "Worker reserved item"
        ),
        Err(e) => warn!(
            worker_id,
            %request_id,
            item_id = %item_id,
            member_id = %member_id,
            error = %e,
            "Worker failed to reserve item"
        ),
    }

    if reply.send(outcome).is_err() {
        debug!(worker_id, %request_id, "Requester stopped listening, reply dropped");
    }
}
