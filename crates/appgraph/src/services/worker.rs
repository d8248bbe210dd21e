use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::data::{panic_message, CoreError};
use crate::services::messages::WorkItem;
use crate::services::queue::GraphQueue;
use crate::traits::WorkItemProcessor;

/// Time subscribers get to join a graph's group before its build starts.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub debounce_window: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }
}

/// Drains the build queue and runs every ready item on its own task.
pub struct QueueService {
    queue: Arc<GraphQueue>,
    processor: Arc<dyn WorkItemProcessor>,
    config: WorkerConfig,
    tasks: TaskTracker,
}

impl QueueService {
    pub fn new(queue: Arc<GraphQueue>, processor: Arc<dyn WorkItemProcessor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            processor,
            config,
            tasks: TaskTracker::new(),
        }
    }

    /// Runs the scheduling loop until `cancel` fires or the queue is closed.
    ///
    /// Builds already dispatched keep running; see [`QueueService::drain`].
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        info!(
            debounce_ms = self.config.debounce_window.as_millis() as u64,
            "QueueService started"
        );
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("QueueService cancelled, shutting down");
                    break;
                }
                next = self.queue.dequeue() => next,
            };

            let item = match next {
                Some(item) => item,
                None => {
                    info!("Queue closed, shutting down");
                    break;
                }
            };

            match item.debounce_remaining(Utc::now(), self.config.debounce_window) {
                Some(remaining) => self.requeue_later(item, remaining, cancel.clone()),
                None => self.dispatch(item),
            }
        }
        Ok(())
    }

    /// Number of dispatched builds and pending requeues still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits up to `grace` for dispatched builds to finish. Returns whether
    /// everything finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => {
                info!("All in-flight builds finished");
                true
            }
            Err(_) => {
                warn!(
                    in_flight = self.tasks.len(),
                    grace_secs = grace.as_secs_f64(),
                    "Shutdown grace period elapsed with builds still running"
                );
                false
            }
        }
    }

    /// Puts a too-young item back once its debounce window has passed, or
    /// right away if the loop is cancelled first.
    fn requeue_later(&self, item: WorkItem, remaining: Duration, cancel: CancellationToken) {
        debug!(
            work_item_id = %item.id,
            graph_id = %item.graph_id,
            remaining_ms = remaining.as_millis() as u64,
            "Work item too young, requeueing"
        );
        let queue = Arc::clone(&self.queue);
        self.tasks.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = cancel.cancelled() => {}
            }
            queue.enqueue(item);
        });
    }

    fn dispatch(&self, item: WorkItem) {
        info!(
            work_item_id = %item.id,
            graph_id = %item.graph_id,
            owner_id = %item.owner_id,
            "Dispatching graph build"
        );
        let processor = Arc::clone(&self.processor);
        self.tasks.spawn(async move {
            match AssertUnwindSafe(processor.process(&item)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    work_item_id = %item.id,
                    graph_id = %item.graph_id,
                    owner_id = %item.owner_id,
                    error = %e,
                    "Graph build ended with an error"
                ),
                Err(panic) => error!(
                    work_item_id = %item.id,
                    graph_id = %item.graph_id,
                    owner_id = %item.owner_id,
                    panic = %panic_message(panic.as_ref()),
                    "Graph build panicked"
                ),
            }
        });
    }
}
