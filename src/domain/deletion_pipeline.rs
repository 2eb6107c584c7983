//! Asynchronous batched soft deletion.
//!
//! Delete requests are accepted into a bounded queue and applied by a fixed
//! pool of workers. Each worker moves through
//! `Draining -> Accumulating -> Flushing -> Draining` and only takes
//! `Flushing -> Terminated` after the queue is closed and its final batch has
//! been flushed.
//!
//! A batch is flushed when it reaches `batch_size` tasks or when
//! `flush_interval` elapses since the previous flush, whichever happens first.
//! Tasks of the same owner are coalesced into one backend call.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::delete_task::DeleteTask;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Retries of a failed `mark_deleted` call before the batch is given up.
const FLUSH_RETRIES: usize = 3;

/// Tuning knobs for [`DeletionPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub queue_capacity: usize,
    pub workers: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enqueue_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            workers: 3,
            batch_size: 100,
            flush_interval: Duration::from_millis(500),
            enqueue_timeout: Duration::from_secs(5),
        }
    }
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<DeleteTask>>>;

/// Bounded deletion queue plus its worker pool.
pub struct DeletionPipeline {
    sender: Mutex<Option<mpsc::Sender<DeleteTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    settings: PipelineSettings,
}

impl DeletionPipeline {
    /// Creates the queue and spawns `settings.workers` consumer tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(repository: Arc<dyn LinkRepository>, settings: PipelineSettings) -> Self {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..settings.workers.max(1))
            .map(|worker_id| {
                tokio::spawn(run_delete_worker(
                    worker_id,
                    receiver.clone(),
                    repository.clone(),
                    settings.batch_size.max(1),
                    settings.flush_interval,
                ))
            })
            .collect();

        info!(
            workers = settings.workers,
            capacity = settings.queue_capacity,
            "Deletion pipeline started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            settings,
        }
    }

    /// Accepts a task into the queue, waiting up to the enqueue timeout.
    ///
    /// Once this returns `Ok`, the task will be applied even if the pipeline is
    /// shut down right after.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Busy`] if the queue stays full past the timeout.
    /// Returns [`AppError::Unavailable`] if the pipeline has been shut down.
    pub async fn enqueue(&self, task: DeleteTask) -> Result<(), AppError> {
        let Some(sender) = self.sender.lock().clone() else {
            return Err(closed_error());
        };

        let owner_id = task.owner_id.clone();
        let count = task.len();

        match sender.send_timeout(task, self.settings.enqueue_timeout).await {
            Ok(()) => {
                metrics::counter!("delete_tasks_enqueued_total").increment(1);
                info!(owner_id = %owner_id, count, "Delete task queued");
                Ok(())
            }
            Err(SendTimeoutError::Timeout(_)) => {
                metrics::counter!("delete_tasks_rejected_total").increment(1);
                error!(owner_id = %owner_id, "Delete queue is full, timeout exceeded");
                Err(AppError::busy(
                    "Delete service busy, try again later",
                    json!({ "timeout_ms": self.settings.enqueue_timeout.as_millis() as u64 }),
                ))
            }
            Err(SendTimeoutError::Closed(_)) => Err(closed_error()),
        }
    }

    /// Returns true once [`Self::shutdown`] has closed the queue.
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .as_ref()
            .is_none_or(|sender| sender.is_closed())
    }

    /// Free slots currently available in the queue.
    pub fn available_capacity(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map_or(0, |sender| sender.capacity())
    }

    /// Closes the queue and waits for every worker to flush and exit.
    ///
    /// Tasks already accepted are applied before this returns. Calling it more
    /// than once is harmless.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Delete worker panicked");
            }
        }

        info!("All delete workers stopped");
    }
}

fn closed_error() -> AppError {
    AppError::unavailable("Delete service is shutting down", json!({}))
}

/// Consumer loop of one worker.
async fn run_delete_worker(
    worker_id: usize,
    receiver: SharedReceiver,
    repository: Arc<dyn LinkRepository>,
    batch_size: usize,
    flush_interval: Duration,
) {
    debug!(worker_id, "Delete worker started");

    let mut batch: Vec<DeleteTask> = Vec::with_capacity(batch_size);
    let mut deadline = Instant::now() + flush_interval;

    loop {
        let next = tokio::time::timeout_at(deadline, async {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        })
        .await;

        match next {
            Ok(Some(task)) => {
                batch.push(task);
                if batch.len() >= batch_size {
                    flush_batch(repository.as_ref(), &mut batch).await;
                    deadline = Instant::now() + flush_interval;
                }
            }
            Ok(None) => {
                flush_batch(repository.as_ref(), &mut batch).await;
                debug!(worker_id, "Delete worker stopped");
                return;
            }
            Err(_) => {
                flush_batch(repository.as_ref(), &mut batch).await;
                deadline = Instant::now() + flush_interval;
            }
        }
    }
}

/// Groups tasks by owner, unions their ID sets and applies them.
///
/// The batch is always left empty. Backend failures are retried with
/// exponential backoff and then logged; they never stop the worker.
pub(crate) async fn flush_batch(repository: &dyn LinkRepository, batch: &mut Vec<DeleteTask>) {
    if batch.is_empty() {
        return;
    }

    metrics::histogram!("delete_batch_size").record(batch.len() as f64);

    for (owner_id, short_ids) in coalesce(batch.drain(..)) {
        let short_ids: Vec<String> = short_ids.into_iter().collect();
        // 50ms, 100ms, 200ms before jitter.
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(25)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(FLUSH_RETRIES);

        let result = RetryIf::spawn(
            strategy,
            || repository.mark_deleted(&owner_id, &short_ids),
            |e: &AppError| e.is_retryable(),
        )
        .await;

        match result {
            Ok(changed) => {
                metrics::counter!("links_deleted_total").increment(changed);
                info!(
                    owner_id = %owner_id,
                    requested = short_ids.len(),
                    deleted = changed,
                    "URLs marked as deleted"
                );
            }
            Err(e) => {
                metrics::counter!("delete_flush_failures_total").increment(1);
                warn!(
                    owner_id = %owner_id,
                    count = short_ids.len(),
                    error = %e,
                    "Failed to delete URLs in batch"
                );
            }
        }
    }
}

fn coalesce(tasks: impl Iterator<Item = DeleteTask>) -> HashMap<String, BTreeSet<String>> {
    let mut by_owner: HashMap<String, BTreeSet<String>> = HashMap::new();
    for task in tasks {
        by_owner
            .entry(task.owner_id)
            .or_default()
            .extend(task.short_ids);
    }
    by_owner
}
