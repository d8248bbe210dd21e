//! Message types flowing through the queue and the notification channel

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{GraphId, GroupKey, UserId, WorkItemId};

/// A request to (re)build one graph.
///
/// Immutable once created: a debounced item goes back on the queue unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: WorkItemId,
    pub graph_id: GraphId,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(graph_id: GraphId, owner_id: UserId) -> Self {
        Self {
            id: WorkItemId::new_v4(),
            graph_id,
            owner_id,
            created_at: Utc::now(),
        }
    }

    /// Notification group of the graph this item builds.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.owner_id, self.graph_id)
    }

    /// Time left until the item is older than `window`, or `None` once it may
    /// be dispatched.
    pub fn debounce_remaining(&self, now: DateTime<Utc>, window: Duration) -> Option<Duration> {
        let ready_at = match chrono::Duration::from_std(window)
            .ok()
            .and_then(|delta| self.created_at.checked_add_signed(delta))
        {
            Some(ready_at) => ready_at,
            // past the representable range: never ready within the window
            None => return Some(window),
        };
        if now < ready_at {
            (ready_at - now).to_std().ok()
        } else {
            None
        }
    }
}

/// Events pushed to a graph's notification group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum GraphEvent {
    /// Progress text; repeatable.
    ReceiveUpdate(String),
    /// Terminal success; fired once per build.
    GraphBuilt,
    /// Terminal failure; fired once per build.
    GraphError,
}

impl GraphEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GraphEvent::GraphBuilt | GraphEvent::GraphError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_created(ago: chrono::Duration) -> WorkItem {
        let mut item = WorkItem::new(GraphId::new_v4(), UserId::new_v4());
        item.created_at = Utc::now() - ago;
        item
    }

    #[test]
    fn test_fresh_item_is_debounced() {
        let item = item_created(chrono::Duration::milliseconds(500));
        let remaining = item
            .debounce_remaining(Utc::now(), Duration::from_secs(3))
            .expect("item is younger than the window");
        assert!(remaining <= Duration::from_millis(2500));
        assert!(remaining > Duration::from_millis(2000));
    }

    #[test]
    fn test_old_item_is_ready() {
        let item = item_created(chrono::Duration::seconds(3));
        assert_eq!(item.debounce_remaining(Utc::now(), Duration::from_secs(3)), None);
    }

    #[test]
    fn test_zero_window_never_debounces() {
        let item = WorkItem::new(GraphId::new_v4(), UserId::new_v4());
        assert_eq!(item.debounce_remaining(item.created_at, Duration::ZERO), None);
    }

    #[test]
    fn test_huge_window_keeps_item_debounced() {
        let item = WorkItem::new(GraphId::new_v4(), UserId::new_v4());
        let window = Duration::from_millis(u64::MAX);
        assert_eq!(item.debounce_remaining(Utc::now(), window), Some(window));
    }

    #[test]
    fn test_group_key_matches_owner_and_graph() {
        let item = WorkItem::new(GraphId::new_v4(), UserId::new_v4());
        assert_eq!(item.group_key(), GroupKey::new(item.owner_id, item.graph_id));
    }

    #[test]
    fn test_event_wire_shape() {
        let update = serde_json::to_value(GraphEvent::ReceiveUpdate("Saving graph".into())).unwrap();
        assert_eq!(update, serde_json::json!({"type": "ReceiveUpdate", "message": "Saving graph"}));

        let built = serde_json::to_value(GraphEvent::GraphBuilt).unwrap();
        assert_eq!(built, serde_json::json!({"type": "GraphBuilt"}));
        assert!(GraphEvent::GraphError.is_terminal());
        assert!(!GraphEvent::ReceiveUpdate(String::new()).is_terminal());
    }
}
