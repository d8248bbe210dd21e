//! Asynchronous application-graph build pipeline
//!
//! Build requests go through a [`GraphQueue`], are picked up by the
//! [`QueueService`] worker and run by the [`GraphProcessor`], which pulls the
//! remote application schema, persists the resulting graph and streams
//! progress to the graph's notification group.

// Core modules
pub mod config;
pub mod data;
pub mod services;
pub mod storage;
pub mod traits;

// Implementation adapters (optional, can be provided externally)
#[cfg(feature = "adapters")]
pub mod adapters;

// Fakes and fixtures for tests of this crate and its dependents
pub mod test_utils;

// Re-export key types for convenient usage
pub use config::PipelineConfig;
pub use data::entities::{App, Edge, EdgesMap, Field, FieldKind, Graph, GraphStatus, Multiplicity, Node, Point, User};
pub use data::errors::{CoreError, RemoteError, RepositoryError};
pub use data::identifiers::{AppId, FieldId, GraphId, GroupKey, UserId, WorkItemId};
pub use data::paging::{Page, PagingRequest};

// Re-export core traits
pub use traits::{
    EncryptionService, GraphNotifier, GraphRepository, RemoteClientFactory, RemoteSchemaClient,
    UserRepository, WorkItemProcessor,
};

// Re-export core services
pub use services::{
    BroadcastNotifier, Collaborators, FetchLimiter, GraphBuildClient, GraphEvent, GraphProcessor,
    GraphQueue, QueueService, WorkItem, WorkerConfig,
};

/// Initialize tracing; `RUST_LOG` wins over `default_level`
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
