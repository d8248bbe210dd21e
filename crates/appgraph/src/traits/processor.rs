use async_trait::async_trait;

use crate::data::CoreError;
use crate::services::messages::WorkItem;

/// Runs one dequeued build request to completion.
///
/// Build failures are handled inside the implementation; an `Err` means the
/// failure could not even be recorded and is only logged by the caller.
#[async_trait]
pub trait WorkItemProcessor: Send + Sync {
    async fn process(&self, item: &WorkItem) -> Result<(), CoreError>;
}
