use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::data::{CoreError, GroupKey};
use crate::services::messages::GraphEvent;
use crate::traits::GraphNotifier;

pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

/// In-process notification hub with one broadcast channel per group.
///
/// Subscribers only see events published after they subscribed. A slow
/// subscriber that falls more than `capacity` events behind loses the oldest.
pub struct BroadcastNotifier {
    capacity: usize,
    groups: Mutex<HashMap<GroupKey, broadcast::Sender<GraphEvent>>>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Joins `group`.
    pub fn subscribe(&self, group: &GroupKey) -> broadcast::Receiver<GraphEvent> {
        let mut groups = self.groups.lock();
        groups
            .entry(group.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers of `group`.
    pub fn subscriber_count(&self, group: &GroupKey) -> usize {
        self.groups
            .lock()
            .get(group)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_BUFFER)
    }
}

#[async_trait]
impl GraphNotifier for BroadcastNotifier {
    async fn publish(&self, group: &GroupKey, event: GraphEvent) -> Result<(), CoreError> {
        let mut groups = self.groups.lock();
        let delivered = match groups.get(group) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        };
        if delivered {
            trace!(group = %group, "Published graph event");
        } else {
            // nobody listening; forget the group so the map does not grow
            groups.remove(group);
            debug!(group = %group, "No subscribers, dropping graph event");
        }
        Ok(())
    }
}
