//! Adapters for external services

pub mod remote_client;

pub use remote_client::{HttpSchemaClient, HttpSchemaClientConfig, HttpSchemaClientFactory};
