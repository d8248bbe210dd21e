use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::data::{EdgesMap, Graph, GraphId, GraphStatus, Node, RepositoryError, User, UserId};
use crate::traits::{GraphRepository, UserRepository};

/// In-memory graph storage, keyed by owner and graph.
#[derive(Default)]
pub struct InMemoryGraphRepository {
    graphs: Arc<RwLock<HashMap<(UserId, GraphId), Graph>>>,
}

impl InMemoryGraphRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, graph_id: &GraphId, owner_id: &UserId, change: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut Graph),
    {
        let mut graphs = self.graphs.write().await;
        let graph = graphs
            .get_mut(&(*owner_id, *graph_id))
            .ok_or_else(|| RepositoryError::QueryError(format!("Graph {} not found for owner {}", graph_id, owner_id)))?;
        change(graph);
        graph.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn get_graph(&self, graph_id: &GraphId, owner_id: &UserId) -> Result<Option<Graph>, RepositoryError> {
        let graphs = self.graphs.read().await;
        Ok(graphs.get(&(*owner_id, *graph_id)).cloned())
    }

    async fn save_graph(&self, graph: &Graph) -> Result<(), RepositoryError> {
        let mut graphs = self.graphs.write().await;
        graphs.insert((graph.owner_id, graph.id), graph.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        graph_id: &GraphId,
        owner_id: &UserId,
        status: GraphStatus,
    ) -> Result<(), RepositoryError> {
        debug!(graph_id = %graph_id, status = ?status, "Updating graph status");
        self.modify(graph_id, owner_id, |graph| graph.status = status).await
    }

    async fn complete_build(
        &self,
        graph_id: &GraphId,
        owner_id: &UserId,
        nodes: Vec<Node>,
        edges_map: EdgesMap,
    ) -> Result<(), RepositoryError> {
        self.modify(graph_id, owner_id, |graph| {
            graph.nodes = nodes;
            graph.edges_map = edges_map;
            graph.status = GraphStatus::Built;
        })
        .await
    }
}

/// In-memory user storage.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove_user(&self, user_id: &UserId) -> Option<User> {
        self.users.write().await.remove(user_id)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id, user.clone());
        Ok(())
    }
}
