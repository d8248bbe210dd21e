//! Persistence boundary for graphs and their owners

use async_trait::async_trait;

use crate::data::{EdgesMap, Graph, GraphId, GraphStatus, Node, RepositoryError, User, UserId};

/// Storage of graph documents.
///
/// Lookups are always scoped by owner: a graph id alone never resolves a graph.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn get_graph(&self, graph_id: &GraphId, owner_id: &UserId) -> Result<Option<Graph>, RepositoryError>;

    /// Inserts or replaces the whole document.
    async fn save_graph(&self, graph: &Graph) -> Result<(), RepositoryError>;

    /// Sets only the status (and `updated_at`), leaving nodes and edges untouched.
    async fn update_status(
        &self,
        graph_id: &GraphId,
        owner_id: &UserId,
        status: GraphStatus,
    ) -> Result<(), RepositoryError>;

    /// Replaces nodes and edges and marks the graph `Built`.
    async fn complete_build(
        &self,
        graph_id: &GraphId,
        owner_id: &UserId,
        nodes: Vec<Node>,
        edges_map: EdgesMap,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError>;
}
