//! Remote schema service boundary

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::{App, AppId, CoreError, Field, Page, PagingRequest, RemoteError};

/// Paginated access to the remote application schema, bound to one credential.
///
/// Every call is independent: an `Err` only fails the page that was asked for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteSchemaClient: Send + Sync {
    /// Whether the remote service is reachable with the bound credential.
    async fn can_connect(&self) -> bool;

    /// Fetches one page of applications.
    async fn get_applications(&self, page: PagingRequest) -> Result<Page<App>, RemoteError>;

    /// Fetches one page of field definitions for `app_id`.
    async fn get_fields(&self, app_id: AppId, page: PagingRequest) -> Result<Page<Field>, RemoteError>;
}

/// Builds remote clients bound to a decrypted credential.
pub trait RemoteClientFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Result<Arc<dyn RemoteSchemaClient>, CoreError>;
}
