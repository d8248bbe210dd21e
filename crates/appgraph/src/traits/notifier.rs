//! Push channel for live build progress

use async_trait::async_trait;

use crate::data::{CoreError, GroupKey};
use crate::services::messages::GraphEvent;

/// Pushes build events to whoever is subscribed to a group.
///
/// Delivery is best effort: a subscriber joining a group after an event was
/// published never sees that event.
#[async_trait]
pub trait GraphNotifier: Send + Sync {
    async fn publish(&self, group: &GroupKey, event: GraphEvent) -> Result<(), CoreError>;

    /// Human-readable progress text; may be sent any number of times.
    async fn receive_update(&self, group: &GroupKey, message: &str) -> Result<(), CoreError> {
        self.publish(group, GraphEvent::ReceiveUpdate(message.to_string())).await
    }

    /// Terminal success signal.
    async fn graph_built(&self, group: &GroupKey) -> Result<(), CoreError> {
        self.publish(group, GraphEvent::GraphBuilt).await
    }

    /// Terminal failure signal.
    async fn graph_error(&self, group: &GroupKey) -> Result<(), CoreError> {
        self.publish(group, GraphEvent::GraphError).await
    }
}
