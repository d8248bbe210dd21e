use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use crate::data::{CoreError, Graph, GraphStatus, GroupKey, User};
use crate::services::messages::WorkItem;
use crate::traits::{
    EncryptionService, GraphNotifier, GraphRepository, RemoteClientFactory, UserRepository,
    WorkItemProcessor,
};

use super::assemble::assemble;
use super::fetch::{fetch_applications, fetch_reference_fields, FetchLimiter};
use super::{NO_APPLICATIONS_FOUND, UNABLE_TO_CONNECT};

/// Everything a build talks to, handed over explicitly at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub graphs: Arc<dyn GraphRepository>,
    pub users: Arc<dyn UserRepository>,
    pub encryption: Arc<dyn EncryptionService>,
    pub clients: Arc<dyn RemoteClientFactory>,
    pub notifier: Arc<dyn GraphNotifier>,
}

/// Builds graphs from the remote schema and drives their status from
/// `Building` to `Built` or `NotBuilt`.
pub struct GraphProcessor {
    collaborators: Collaborators,
    max_concurrent_fetches: Option<usize>,
}

impl GraphProcessor {
    /// `max_concurrent_fetches` bounds remote page calls per build; `None`
    /// leaves the fan-out unbounded.
    pub fn new(collaborators: Collaborators, max_concurrent_fetches: Option<usize>) -> Self {
        Self {
            collaborators,
            max_concurrent_fetches,
        }
    }

    async fn update(&self, group: &GroupKey, message: &str) -> Result<(), CoreError> {
        self.collaborators.notifier.receive_update(group, message).await
    }

    /// Runs the build steps up to and including persistence.
    async fn build(&self, item: &WorkItem, graph: &Graph, owner: &User, group: &GroupKey) -> Result<(), CoreError> {
        self.update(group, "Starting graph build").await?;
        let api_key = self
            .collaborators
            .encryption
            .decrypt(&graph.credential, owner)
            .await?;
        let client = self.collaborators.clients.create(&api_key)?;

        self.update(group, "Checking connection to the remote service").await?;
        if !client.can_connect().await {
            return Err(CoreError::processing(UNABLE_TO_CONNECT, None::<CoreError>));
        }

        let limiter = FetchLimiter::new(self.max_concurrent_fetches);

        self.update(group, "Fetching applications").await?;
        let apps = fetch_applications(client.as_ref(), &limiter, item).await?;
        if apps.is_empty() {
            return Err(CoreError::processing(NO_APPLICATIONS_FOUND, None::<CoreError>));
        }

        self.update(group, &format!("Fetching fields for {} applications", apps.len()))
            .await?;
        let edges = fetch_reference_fields(client.as_ref(), &limiter, item, &apps).await;
        debug!(
            graph_id = %item.graph_id,
            apps = apps.len(),
            reference_fields = edges.len(),
            "Fetched remote schema"
        );

        self.update(group, "Building graph").await?;
        let assembled = assemble(apps, edges);

        self.update(group, "Saving graph").await?;
        let node_count = assembled.nodes.len();
        let edge_count = assembled.edge_count();
        self.collaborators
            .graphs
            .complete_build(&item.graph_id, &item.owner_id, assembled.nodes, assembled.edges_map)
            .await?;

        info!(
            work_item_id = %item.id,
            graph_id = %item.graph_id,
            owner_id = %item.owner_id,
            nodes = node_count,
            edges = edge_count,
            "Graph built"
        );
        Ok(())
    }

    /// Reports a failed build and leaves the graph `NotBuilt`.
    async fn fail(&self, item: &WorkItem, group: &GroupKey, failure: CoreError) -> Result<(), CoreError> {
        let notifier = &self.collaborators.notifier;
        if let Some(message) = failure.processing_message() {
            if let Err(e) = notifier.receive_update(group, message).await {
                warn!(graph_id = %item.graph_id, error = %e, "Failed to push failure message");
            }
        }
        if let Err(e) = notifier.graph_error(group).await {
            warn!(graph_id = %item.graph_id, error = %e, "Failed to push error signal");
        }

        let persisted = self
            .collaborators
            .graphs
            .update_status(&item.graph_id, &item.owner_id, GraphStatus::NotBuilt)
            .await;

        error!(
            work_item_id = %item.id,
            graph_id = %item.graph_id,
            owner_id = %item.owner_id,
            error = %failure,
            "Graph build failed"
        );
        persisted.map_err(CoreError::from)
    }
}

#[async_trait]
impl WorkItemProcessor for GraphProcessor {
    #[instrument(
        skip(self, item),
        fields(work_item_id = %item.id, graph_id = %item.graph_id, owner_id = %item.owner_id)
    )]
    async fn process(&self, item: &WorkItem) -> Result<(), CoreError> {
        let graph = match self
            .collaborators
            .graphs
            .get_graph(&item.graph_id, &item.owner_id)
            .await?
        {
            Some(graph) => graph,
            None => {
                warn!(
                    work_item_id = %item.id,
                    graph_id = %item.graph_id,
                    owner_id = %item.owner_id,
                    "Graph not found, skipping build"
                );
                return Ok(());
            }
        };

        let owner = match self.collaborators.users.get_user(&item.owner_id).await? {
            Some(owner) => owner,
            None => {
                warn!(
                    work_item_id = %item.id,
                    graph_id = %item.graph_id,
                    owner_id = %item.owner_id,
                    "Graph owner not found, skipping build"
                );
                return Ok(());
            }
        };

        let group = item.group_key();
        // a panicking collaborator still has to leave the graph NotBuilt
        let outcome = match AssertUnwindSafe(self.build(item, &graph, &owner, &group))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => Err(CoreError::panicked(payload.as_ref())),
        };
        match outcome {
            Ok(()) => {
                if let Err(e) = self.collaborators.notifier.graph_built(&group).await {
                    warn!(graph_id = %item.graph_id, error = %e, "Failed to push built signal");
                }
                Ok(())
            }
            Err(failure) => self.fail(item, &group, failure).await,
        }
    }
}
