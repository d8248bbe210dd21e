use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::data::{App, AppId, CoreError, Field, GraphId, GroupKey, Page, PagingRequest, RemoteError, User};
use crate::services::messages::{GraphEvent, WorkItem};
use crate::traits::{EncryptionService, GraphNotifier, RemoteClientFactory, RemoteSchemaClient, WorkItemProcessor};

/// A call observed by [`FakeSchemaClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CanConnect,
    Applications(u32),
    Fields(AppId, u32),
}

type ScriptedPages<T> = Vec<Result<Vec<T>, RemoteError>>;

/// Scripted remote schema service.
///
/// Pages are served by number; `total_pages` is the number of scripted pages.
/// Unscripted application pages answer 404, applications without scripted
/// fields have a single empty page.
pub struct FakeSchemaClient {
    connected: bool,
    app_pages: ScriptedPages<App>,
    field_pages: HashMap<AppId, ScriptedPages<Field>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RemoteCall>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSchemaClient {
    pub fn new() -> Self {
        Self {
            connected: true,
            app_pages: Vec::new(),
            field_pages: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn with_apps(mut self, pages: Vec<Vec<App>>) -> Self {
        self.app_pages = pages.into_iter().map(Ok).collect();
        self
    }

    /// Makes a scripted applications page answer with a server error.
    pub fn with_app_page_failure(mut self, page_number: u32) -> Self {
        if let Some(page) = self.app_pages.get_mut(page_index(page_number)) {
            *page = Err(server_error());
        }
        self
    }

    pub fn with_fields(mut self, app_id: AppId, pages: Vec<Vec<Field>>) -> Self {
        self.field_pages.insert(app_id, pages.into_iter().map(Ok).collect());
        self
    }

    pub fn with_field_page_failure(mut self, app_id: AppId, page_number: u32) -> Self {
        if let Some(page) = self
            .field_pages
            .get_mut(&app_id)
            .and_then(|pages| pages.get_mut(page_index(page_number)))
        {
            *page = Err(server_error());
        }
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Highest number of page calls that were in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn record<T>(&self, call: RemoteCall, answer: T) -> T {
        debug!(call = ?call, "Fake remote call");
        self.calls.lock().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer
    }
}

impl Default for FakeSchemaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakeSchemaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeSchemaClient")
            .field("connected", &self.connected)
            .field("app_pages", &self.app_pages.len())
            .finish()
    }
}

fn page_index(page_number: u32) -> usize {
    (page_number as usize).wrapping_sub(1)
}

fn server_error() -> RemoteError {
    RemoteError::Status {
        status: 500,
        body: "scripted failure".to_string(),
    }
}

fn serve<T: Clone>(pages: &[Result<Vec<T>, RemoteError>], request: PagingRequest) -> Result<Page<T>, RemoteError> {
    match pages.get(page_index(request.page_number)) {
        Some(Ok(items)) => Ok(Page {
            page_number: request.page_number,
            total_pages: pages.len() as u32,
            items: items.clone(),
        }),
        Some(Err(e)) => Err(e.clone()),
        None => Err(RemoteError::Status {
            status: 404,
            body: format!("page {} does not exist", request.page_number),
        }),
    }
}

#[async_trait]
impl RemoteSchemaClient for FakeSchemaClient {
    async fn can_connect(&self) -> bool {
        self.record(RemoteCall::CanConnect, self.connected).await
    }

    async fn get_applications(&self, page: PagingRequest) -> Result<Page<App>, RemoteError> {
        let answer = serve(&self.app_pages, page);
        self.record(RemoteCall::Applications(page.page_number), answer).await
    }

    async fn get_fields(&self, app_id: AppId, page: PagingRequest) -> Result<Page<Field>, RemoteError> {
        let answer = match self.field_pages.get(&app_id) {
            Some(pages) => serve(pages, page),
            None => Ok(Page {
                page_number: page.page_number,
                total_pages: 1,
                items: Vec::new(),
            }),
        };
        self.record(RemoteCall::Fields(app_id, page.page_number), answer).await
    }
}

/// Hands out one shared client and remembers the credentials it was given.
pub struct FakeClientFactory {
    client: Mutex<Arc<dyn RemoteSchemaClient>>,
    created_with: Mutex<Vec<String>>,
}

impl FakeClientFactory {
    pub fn new(client: Arc<dyn RemoteSchemaClient>) -> Self {
        Self {
            client: Mutex::new(client),
            created_with: Mutex::new(Vec::new()),
        }
    }

    /// Swaps the client handed to later builds.
    pub fn set_client(&self, client: Arc<dyn RemoteSchemaClient>) {
        *self.client.lock() = client;
    }

    pub fn created_with(&self) -> Vec<String> {
        self.created_with.lock().clone()
    }
}

impl RemoteClientFactory for FakeClientFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn RemoteSchemaClient>, CoreError> {
        self.created_with.lock().push(api_key.to_string());
        Ok(Arc::clone(&self.client.lock()))
    }
}

/// Notifier that keeps every published event in order.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(GroupKey, GraphEvent)>>,
    fail_updates: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// From now on progress updates fail; terminal signals still go through.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<(GroupKey, GraphEvent)> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, group: &GroupKey) -> Vec<GraphEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(key, _)| key == group)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl GraphNotifier for RecordingNotifier {
    async fn publish(&self, group: &GroupKey, event: GraphEvent) -> Result<(), CoreError> {
        if matches!(event, GraphEvent::ReceiveUpdate(_)) && self.fail_updates.load(Ordering::SeqCst) {
            return Err(CoreError::Notification("update channel unavailable".to_string()));
        }
        self.events.lock().push((group.clone(), event));
        Ok(())
    }
}

/// Reversible stand-in for credential encryption: `enc:{key material}:{plaintext}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeEncryptionService;

impl FakeEncryptionService {
    pub fn seal(plaintext: &str, owner: &User) -> String {
        format!("enc:{}:{}", owner.key_material, plaintext)
    }
}

#[async_trait]
impl EncryptionService for FakeEncryptionService {
    async fn encrypt(&self, plaintext: &str, owner: &User) -> Result<String, CoreError> {
        Ok(Self::seal(plaintext, owner))
    }

    async fn decrypt(&self, ciphertext: &str, owner: &User) -> Result<String, CoreError> {
        ciphertext
            .strip_prefix(&format!("enc:{}:", owner.key_material))
            .map(str::to_string)
            .ok_or_else(|| CoreError::Encryption("credential was not sealed for this owner".to_string()))
    }
}

/// Processor that records what it was given, optionally failing or
/// panicking for chosen graphs.
#[derive(Default)]
pub struct RecordingProcessor {
    processed: Mutex<Vec<WorkItem>>,
    failing: Mutex<HashSet<GraphId>>,
    panicking: Mutex<HashSet<GraphId>>,
    delay: Option<Duration>,
}

impl RecordingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every build takes this long to finish.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_for(&self, graph_id: GraphId) {
        self.failing.lock().insert(graph_id);
    }

    pub fn panic_for(&self, graph_id: GraphId) {
        self.panicking.lock().insert(graph_id);
    }

    /// Items whose build ran to the end, in completion order.
    pub fn processed(&self) -> Vec<WorkItem> {
        self.processed.lock().clone()
    }

    /// Polls until at least `count` builds finished, or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.processed.lock().len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl WorkItemProcessor for RecordingProcessor {
    async fn process(&self, item: &WorkItem) -> Result<(), CoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.lock().contains(&item.graph_id) {
            panic!("scripted panic for graph {}", item.graph_id);
        }
        self.processed.lock().push(item.clone());
        if self.failing.lock().contains(&item.graph_id) {
            return Err(CoreError::Internal("scripted failure".to_string()));
        }
        Ok(())
    }
}
