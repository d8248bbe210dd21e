//! Paginated, concurrent retrieval of applications and their reference fields

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::data::{App, AppId, CoreError, Edge, Field, PagingRequest};
use crate::services::messages::WorkItem;
use crate::traits::RemoteSchemaClient;

use super::UNABLE_TO_FETCH_APPLICATIONS;

/// Bounds the number of remote page calls in flight during one build.
///
/// Unbounded unless a limit is given.
#[derive(Debug, Clone, Default)]
pub struct FetchLimiter {
    semaphore: Option<Arc<Semaphore>>,
}

impl FetchLimiter {
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            semaphore: max_in_flight.map(|max| Arc::new(Semaphore::new(max.max(1)))),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Awaits `call` while holding a permit, if the limiter is bounded.
    pub async fn run<F: Future>(&self, call: F) -> F::Output {
        let _permit = match &self.semaphore {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        call.await
    }
}

/// Append-only collection shared by concurrently completing page fetches.
pub(crate) struct Accumulator<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Accumulator<T> {
    pub(crate) fn new() -> Self {
        Self { items: Mutex::new(Vec::new()) }
    }

    pub(crate) fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.items.lock().extend(items);
    }

    pub(crate) fn into_inner(self) -> Vec<T> {
        self.items.into_inner()
    }
}

/// Fetches every application page.
///
/// The first page must succeed; any later page that fails is logged and its
/// items are left out.
pub(crate) async fn fetch_applications(
    client: &dyn RemoteSchemaClient,
    limiter: &FetchLimiter,
    item: &WorkItem,
) -> Result<Vec<App>, CoreError> {
    let first = limiter
        .run(client.get_applications(PagingRequest::first()))
        .await
        .map_err(|e| CoreError::processing(UNABLE_TO_FETCH_APPLICATIONS, Some(e)))?;

    debug!(
        graph_id = %item.graph_id,
        total_pages = first.total_pages,
        has_more = first.has_more(),
        "Fetched first applications page"
    );

    let apps = Accumulator::new();
    apps.extend(first.items);

    let apps_ref = &apps;
    join_all(PagingRequest::remaining(first.total_pages).map(|page| async move {
        match limiter.run(client.get_applications(page)).await {
            Ok(result) => apps_ref.extend(result.items),
            Err(e) => warn!(
                work_item_id = %item.id,
                graph_id = %item.graph_id,
                owner_id = %item.owner_id,
                page = page.page_number,
                error = %e,
                "Failed to fetch applications page, skipping it"
            ),
        }
    }))
    .await;

    Ok(apps.into_inner())
}

/// Fetches the fields of every application concurrently and keeps the
/// reference fields as edges. Failures only drop the affected pages.
pub(crate) async fn fetch_reference_fields(
    client: &dyn RemoteSchemaClient,
    limiter: &FetchLimiter,
    item: &WorkItem,
    apps: &[App],
) -> Vec<Edge> {
    let edges = Accumulator::new();
    join_all(
        apps.iter()
            .map(|app| fetch_app_fields(client, limiter, item, app.id, &edges)),
    )
    .await;
    edges.into_inner()
}

async fn fetch_app_fields(
    client: &dyn RemoteSchemaClient,
    limiter: &FetchLimiter,
    item: &WorkItem,
    app_id: AppId,
    edges: &Accumulator<Edge>,
) {
    let first = match limiter.run(client.get_fields(app_id, PagingRequest::first())).await {
        Ok(page) => page,
        Err(e) => {
            warn!(
                work_item_id = %item.id,
                graph_id = %item.graph_id,
                owner_id = %item.owner_id,
                app_id = %app_id,
                error = %e,
                "Failed to fetch fields, skipping application"
            );
            return;
        }
    };

    edges.extend(reference_edges(first.items));

    join_all(PagingRequest::remaining(first.total_pages).map(|page| async move {
        match limiter.run(client.get_fields(app_id, page)).await {
            Ok(result) => edges.extend(reference_edges(result.items)),
            Err(e) => warn!(
                work_item_id = %item.id,
                graph_id = %item.graph_id,
                owner_id = %item.owner_id,
                app_id = %app_id,
                page = page.page_number,
                error = %e,
                "Failed to fetch fields page, skipping it"
            ),
        }
    }))
    .await;
}

fn reference_edges(fields: Vec<Field>) -> impl Iterator<Item = Edge> {
    fields.into_iter().filter_map(Field::into_edge)
}
