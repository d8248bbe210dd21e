//! Collaborator traits (interfaces) of the build pipeline

pub mod encryption;
pub mod notifier;
pub mod processor;
pub mod remote_schema;
pub mod repositories;

pub use encryption::EncryptionService;
pub use notifier::GraphNotifier;
pub use processor::WorkItemProcessor;
pub use remote_schema::{RemoteClientFactory, RemoteSchemaClient};
pub use repositories::{GraphRepository, UserRepository};

#[cfg(test)]
pub use remote_schema::MockRemoteSchemaClient;
