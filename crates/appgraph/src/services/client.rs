use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::data::{CoreError, Graph, GraphId, GraphStatus, UserId};
use crate::services::messages::WorkItem;
use crate::services::queue::GraphQueue;
use crate::traits::{EncryptionService, GraphRepository, UserRepository};

/// Entry point for the request side: registers graphs and asks for builds.
///
/// Every call leaves the graph `Building` and puts a fresh work item on the
/// queue.
#[derive(Clone)]
pub struct GraphBuildClient {
    graphs: Arc<dyn GraphRepository>,
    users: Arc<dyn UserRepository>,
    encryption: Arc<dyn EncryptionService>,
    queue: Arc<GraphQueue>,
}

impl GraphBuildClient {
    pub fn new(
        graphs: Arc<dyn GraphRepository>,
        users: Arc<dyn UserRepository>,
        encryption: Arc<dyn EncryptionService>,
        queue: Arc<GraphQueue>,
    ) -> Self {
        Self {
            graphs,
            users,
            encryption,
            queue,
        }
    }

    /// Stores a new graph for `owner_id` with its credential encrypted, and
    /// queues its first build.
    pub async fn register_graph(
        &self,
        owner_id: UserId,
        name: impl Into<String>,
        api_key: &str,
    ) -> Result<Graph, CoreError> {
        let owner = self
            .users
            .get_user(&owner_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", owner_id))?;

        let credential = self.encryption.encrypt(api_key, &owner).await?;
        let graph = Graph::new(owner_id, name, credential);
        self.graphs.save_graph(&graph).await?;

        let item = WorkItem::new(graph.id, owner_id);
        info!(
            work_item_id = %item.id,
            graph_id = %graph.id,
            owner_id = %owner_id,
            "Graph registered, build queued"
        );
        self.queue.enqueue(item);
        Ok(graph)
    }

    /// Marks an existing graph `Building` and queues a rebuild.
    pub async fn request_build(&self, graph_id: GraphId, owner_id: UserId) -> Result<WorkItem, CoreError> {
        let mut graph = self
            .graphs
            .get_graph(&graph_id, &owner_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Graph", graph_id))?;

        graph.status = GraphStatus::Building;
        graph.updated_at = Utc::now();
        self.graphs.save_graph(&graph).await?;

        let item = WorkItem::new(graph_id, owner_id);
        info!(
            work_item_id = %item.id,
            graph_id = %graph_id,
            owner_id = %owner_id,
            "Graph build requested"
        );
        self.queue.enqueue(item.clone());
        Ok(item)
    }
}
