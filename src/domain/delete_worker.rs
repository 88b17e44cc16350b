//! Background worker pool applying soft deletes.

use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::delete_job::{BatchOutcome, DeleteBatch, DeleteTicket, partition};
use crate::domain::repositories::UrlRepository;

/// Sizing of the delete pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePipelineConfig {
    /// Number of concurrent worker tasks.
    pub workers: usize,
    /// Maximum number of short codes per `mark_deleted` call.
    pub batch_size: usize,
    /// Number of batches that may wait in the queue, and number of accepted
    /// batches that may wait to enter it. Requests beyond that are dropped.
    pub queue_capacity: usize,
}

impl Default for DeletePipelineConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            batch_size: 1000,
            queue_capacity: 1024,
        }
    }
}

/// Fixed pool of workers consuming a shared queue of [`DeleteBatch`]es.
///
/// [`submit`](Self::submit) never waits on storage: batches are pushed by a
/// detached producer task and applied by whichever worker is free. There is
/// no retry and no ordering between batches. Failures are logged and reported
/// only through the returned [`DeleteTicket`].
///
/// Batches waiting for a queue slot hold permits from a budget of
/// `queue_capacity`. A request that finds the budget exhausted is dropped
/// instead of spawning another producer. A single request larger than the
/// budget takes all of it.
///
/// [`shutdown`](Self::shutdown) closes the queue and waits for every batch
/// already accepted to be applied.
pub struct DeletePipeline {
    sender: Mutex<Option<mpsc::Sender<DeleteBatch>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<Semaphore>,
    pending_limit: usize,
    batch_size: usize,
}

impl DeletePipeline {
    /// Starts `config.workers` worker tasks on the current Tokio runtime.
    pub fn spawn<R>(repository: Arc<R>, config: DeletePipelineConfig) -> Self
    where
        R: UrlRepository + ?Sized + 'static,
    {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let rx = Arc::new(AsyncMutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                tokio::spawn(run_delete_worker(
                    worker_id,
                    rx.clone(),
                    repository.clone(),
                ))
            })
            .collect::<Vec<_>>();

        info!(
            workers = workers.len(),
            batch_size = config.batch_size,
            "Delete pipeline started"
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            pending: Arc::new(Semaphore::new(capacity)),
            pending_limit: capacity,
            batch_size: config.batch_size,
        }
    }

    /// Accepts a delete request and returns immediately.
    ///
    /// After [`shutdown`](Self::shutdown), or while the pending budget is
    /// exhausted, the request is dropped and the ticket completes with zero
    /// batches applied.
    pub fn submit(&self, owner_id: &str, short_codes: Vec<String>) -> DeleteTicket {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let batches = partition(owner_id, short_codes, self.batch_size, &reply_tx);
        let ticket = DeleteTicket::new(batches.len(), reply_rx);

        if batches.is_empty() {
            return ticket;
        }

        let Some(sender) = self.current_sender() else {
            warn!(
                owner_id,
                batches = batches.len(),
                "Delete pipeline is shut down, dropping request"
            );
            return ticket;
        };

        let wanted = batches.len().min(self.pending_limit) as u32;
        let Ok(permit) = self.pending.clone().try_acquire_many_owned(wanted) else {
            warn!(
                owner_id,
                batches = batches.len(),
                "Delete queue is full, dropping request"
            );
            return ticket;
        };

        debug!(owner_id, batches = batches.len(), "Delete request accepted");

        tokio::spawn(async move {
            for batch in batches {
                if sender.send(batch).await.is_err() {
                    warn!("Delete queue closed while enqueueing batches");
                    break;
                }
            }
            drop(permit);
        });

        ticket
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.current_sender().is_none()
    }

    /// Closes the queue and waits until all workers have drained it.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().map(|mut s| s.take()).unwrap_or(None);
        drop(sender);

        let workers = self
            .workers
            .lock()
            .map(|mut w| std::mem::take(&mut *w))
            .unwrap_or_default();

        for handle in workers {
            if let Err(e) = handle.await {
                error!("Delete worker terminated abnormally: {}", e);
            }
        }

        info!("Delete pipeline drained");
    }

    fn current_sender(&self) -> Option<mpsc::Sender<DeleteBatch>> {
        self.sender.lock().ok().and_then(|s| s.clone())
    }
}

/// Pulls batches from the shared queue until it is closed and empty.
async fn run_delete_worker<R>(
    worker_id: usize,
    rx: Arc<AsyncMutex<mpsc::Receiver<DeleteBatch>>>,
    repository: Arc<R>,
) where
    R: UrlRepository + ?Sized,
{
    loop {
        let next = rx.lock().await.recv().await;
        let Some(batch) = next else {
            break;
        };

        match repository
            .mark_deleted(&batch.owner_id, &batch.short_codes)
            .await
        {
            Ok(rows) => {
                debug!(
                    worker_id,
                    owner_id = %batch.owner_id,
                    requested = batch.short_codes.len(),
                    rows,
                    "Delete batch applied"
                );
                batch.complete(BatchOutcome::Applied(rows));
            }
            Err(e) => {
                warn!(
                    worker_id,
                    owner_id = %batch.owner_id,
                    requested = batch.short_codes.len(),
                    "Delete batch failed: {}",
                    e
                );
                batch.complete(BatchOutcome::Failed);
            }
        }
    }

    debug!(worker_id, "Delete worker stopped");
}
