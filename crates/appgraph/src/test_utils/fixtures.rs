use std::sync::Arc;

use crate::data::{App, AppId, Field, FieldId, FieldKind, Graph, GroupKey, Multiplicity, User};
use crate::services::messages::{GraphEvent, WorkItem};
use crate::services::processor::Collaborators;
use crate::storage::{InMemoryGraphRepository, InMemoryUserRepository};
use crate::traits::{GraphRepository, RemoteSchemaClient, UserRepository};

use super::fakes::{FakeClientFactory, FakeEncryptionService, FakeSchemaClient, RecordingNotifier};

pub const API_KEY: &str = "test-api-key";

pub fn app(id: i64) -> App {
    App {
        id: AppId(id),
        name: format!("App {}", id),
    }
}

pub fn reference_field(id: i64, app_id: i64, referenced_app_id: i64) -> Field {
    Field {
        id: FieldId(id),
        app_id: AppId(app_id),
        name: format!("Reference {}", id),
        is_required: false,
        is_unique: false,
        kind: FieldKind::Reference {
            referenced_app_id: AppId(referenced_app_id),
            multiplicity: Multiplicity::SingleSelect,
        },
    }
}

pub fn text_field(id: i64, app_id: i64) -> Field {
    Field {
        id: FieldId(id),
        app_id: AppId(app_id),
        name: format!("Text {}", id),
        is_required: false,
        is_unique: false,
        kind: FieldKind::Other {
            field_type: "Text".to_string(),
        },
    }
}

/// A registered owner and `Building` graph wired to in-memory storage and
/// recording fakes.
pub struct ProcessorHarness {
    pub graphs: Arc<InMemoryGraphRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub client: Arc<FakeSchemaClient>,
    pub factory: Arc<FakeClientFactory>,
    pub owner: User,
    pub graph: Graph,
    pub api_key: String,
}

impl ProcessorHarness {
    pub async fn new(client: FakeSchemaClient) -> Self {
        let client = Arc::new(client);
        let factory = Arc::new(FakeClientFactory::new(client.clone()));
        Self::seed(client, factory).await
    }

    /// Serves builds from `client` instead of a scripted fake.
    pub async fn with_client(client: Arc<dyn RemoteSchemaClient>) -> Self {
        let factory = Arc::new(FakeClientFactory::new(client));
        Self::seed(Arc::new(FakeSchemaClient::new()), factory).await
    }

    async fn seed(client: Arc<FakeSchemaClient>, factory: Arc<FakeClientFactory>) -> Self {
        let graphs = Arc::new(InMemoryGraphRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let owner = User::new("owner", "owner-key");
        let graph = Graph::new(owner.id, "Test graph", FakeEncryptionService::seal(API_KEY, &owner));

        users.save_user(&owner).await.expect("in-memory save");
        graphs.save_graph(&graph).await.expect("in-memory save");

        Self {
            graphs,
            users,
            notifier: Arc::new(RecordingNotifier::new()),
            client,
            factory,
            owner,
            graph,
            api_key: API_KEY.to_string(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            graphs: self.graphs.clone(),
            users: self.users.clone(),
            encryption: Arc::new(FakeEncryptionService),
            clients: self.factory.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn work_item(&self) -> WorkItem {
        WorkItem::new(self.graph.id, self.owner.id)
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.owner.id, self.graph.id)
    }

    /// Events published to this graph's group, in order.
    pub fn events(&self) -> Vec<GraphEvent> {
        self.notifier.events_for(&self.group_key())
    }

    pub async fn stored_graph(&self) -> Graph {
        self.graphs
            .get_graph(&self.graph.id, &self.owner.id)
            .await
            .expect("in-memory read")
            .expect("graph was seeded")
    }

    pub async fn remove_owner(&self) {
        self.users.remove_user(&self.owner.id).await;
    }
}
