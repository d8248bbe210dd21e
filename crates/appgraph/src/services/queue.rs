use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::services::messages::WorkItem;

/// Unbounded FIFO of pending build requests.
///
/// Any number of producers may enqueue concurrently; consumers take turns on
/// the receiving end, so dequeue may also be called from several tasks.
pub struct GraphQueue {
    // the only sender; dropping it closes the channel
    sender: SyncMutex<Option<mpsc::UnboundedSender<WorkItem>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<WorkItem>>,
}

impl GraphQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: SyncMutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
        }
    }

    /// Adds an item to the back of the queue. Never blocks.
    pub fn enqueue(&self, item: WorkItem) {
        let rejected = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(item).err().map(|mpsc::error::SendError(item)| item),
            None => Some(item),
        };
        if let Some(item) = rejected {
            warn!(
                work_item_id = %item.id,
                graph_id = %item.graph_id,
                "Queue is closed, dropping work item"
            );
        }
    }

    /// Waits for the next item. Returns `None` once the queue is closed and drained.
    ///
    /// Cancel safe: dropping the future never loses an item.
    pub async fn dequeue(&self) -> Option<WorkItem> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Stops accepting new items. Items already queued can still be dequeued,
    /// after which waiting consumers receive `None`.
    pub fn close(&self) {
        self.sender.lock().take();
    }
}

impl Default for GraphQueue {
    fn default() -> Self {
        Self::new()
    }
}
