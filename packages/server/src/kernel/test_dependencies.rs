// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps and the
// pipeline stages. Every mock records the calls it receives.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::nats::TestBus;
use super::{
    BaseAI, BaseDirectory, BaseDocumentIndex, BaseIdentifierSearch, BaseLeadPatcher,
    BaseRegistry, BaseSearchService, LatLng, OrganicResult, PlaceDetails, PlaceResult,
    RegistryRecord, SearchPage, SearchResult, ServerDeps,
};
use crate::domains::discovery::{InMemoryCursorStore, PageDelay};
use crate::domains::leads::{InMemoryLeadStore, PatchError};

// =============================================================================
// Mock AI
// =============================================================================

pub struct MockAI {
    responses: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            fail: false,
        }
    }

    /// Always errors, like an unreachable inference server.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Queue a response; responses are returned in order.
    pub fn with_response(self, response: &str) -> Self {
        self.responses.lock().unwrap().push_back(response.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("mock inference server unavailable");
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("MockAI: no more responses queued"))
    }
}

// =============================================================================
// Mock Web Search
// =============================================================================

pub struct MockSearchService {
    results: Vec<SearchResult>,
    queries: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockSearchService {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            queries: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockSearchService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSearchService for MockSearchService {
    async fn search(&self, query: &str, _max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            anyhow::bail!("mock web search unavailable");
        }
        Ok(self.results.clone())
    }
}

// =============================================================================
// Mock Identifier Search
// =============================================================================

pub struct MockIdentifierSearch {
    results: Vec<OrganicResult>,
    queries: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockIdentifierSearch {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            queries: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_results(mut self, results: Vec<OrganicResult>) -> Self {
        self.results = results;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockIdentifierSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseIdentifierSearch for MockIdentifierSearch {
    async fn search(&self, query: &str, _num_results: usize) -> Result<Vec<OrganicResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            anyhow::bail!("mock identifier search unavailable");
        }
        Ok(self.results.clone())
    }
}

// =============================================================================
// Mock Registry
// =============================================================================

pub struct MockRegistry {
    record: Option<RegistryRecord>,
    lookups: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            record: None,
            lookups: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_record(mut self, record: RegistryRecord) -> Self {
        self.record = Some(record);
        self
    }

    /// (company name, city) pairs looked up so far.
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().unwrap().clone()
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRegistry for MockRegistry {
    async fn lookup(&self, company_name: &str, city: &str) -> Result<Option<RegistryRecord>> {
        self.lookups
            .lock()
            .unwrap()
            .push((company_name.to_string(), city.to_string()));
        if self.fail {
            anyhow::bail!("mock registry unavailable");
        }
        Ok(self.record.clone())
    }
}

// =============================================================================
// Mock Places Directory
// =============================================================================

/// Scripted directory. Pages are served in order; once they run out every
/// search answers `ZERO_RESULTS`.
pub struct MockDirectory {
    center: Option<LatLng>,
    pages: Mutex<VecDeque<SearchPage>>,
    details: Mutex<HashMap<String, PlaceDetails>>,
    page_tokens: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            center: Some(LatLng {
                lat: -22.9056,
                lng: -47.0608,
            }),
            pages: Mutex::new(VecDeque::new()),
            details: Mutex::new(HashMap::new()),
            page_tokens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn without_geocode(mut self) -> Self {
        self.center = None;
        self
    }

    /// Queue an OK page holding places with the given ids.
    pub fn with_page(self, place_ids: &[&str], next_page_token: Option<&str>) -> Self {
        let results = place_ids
            .iter()
            .map(|id| PlaceResult {
                place_id: id.to_string(),
                name: format!("Place {}", id),
                formatted_address: None,
                rating: Some(4.5),
                user_ratings_total: Some(10),
                price_level: None,
                business_status: Some("OPERATIONAL".to_string()),
                vicinity: None,
                permanently_closed: None,
                types: vec!["bakery".to_string(), "food".to_string()],
            })
            .collect();
        self.push_page(SearchPage {
            results,
            status: "OK".to_string(),
            next_page_token: next_page_token.map(str::to_string),
            error_message: None,
        })
    }

    pub fn with_zero_results(self) -> Self {
        self.with_status(places_client::ZERO_RESULTS)
    }

    /// Queue an empty page with the given status.
    pub fn with_status(self, status: &str) -> Self {
        self.push_page(SearchPage {
            results: Vec::new(),
            status: status.to_string(),
            next_page_token: None,
            error_message: Some(format!("mock status {}", status)),
        })
    }

    pub fn with_details(self, place_id: &str, details: PlaceDetails) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(place_id.to_string(), details);
        self
    }

    fn push_page(self, page: SearchPage) -> Self {
        self.pages.lock().unwrap().push_back(page);
        self
    }

    /// Page tokens of every text search, in call order.
    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.page_tokens.lock().unwrap().clone()
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDirectory for MockDirectory {
    async fn geocode(&self, _address: &str, _country: &str) -> Result<Option<LatLng>> {
        Ok(self.center)
    }

    async fn text_search(
        &self,
        _query: &str,
        _location: LatLng,
        _radius_meters: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        self.page_tokens
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));
        let page = self.pages.lock().unwrap().pop_front();
        Ok(page.unwrap_or_else(|| SearchPage {
            results: Vec::new(),
            status: places_client::ZERO_RESULTS.to_string(),
            next_page_token: None,
            error_message: None,
        }))
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        self.details
            .lock()
            .unwrap()
            .get(place_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no details for {}", place_id))
    }
}

// =============================================================================
// Mock Document Index
// =============================================================================

pub struct MockDocumentIndex {
    documents: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
    fail: bool,
}

impl MockDocumentIndex {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// (collection, id, document) for every successful write.
    pub fn documents(&self) -> Vec<(String, String, serde_json::Value)> {
        self.documents.lock().unwrap().clone()
    }
}

impl Default for MockDocumentIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDocumentIndex for MockDocumentIndex {
    async fn index(&self, collection: &str, id: &str, document: &serde_json::Value) -> Result<()> {
        if self.fail {
            anyhow::bail!("mock document index unavailable");
        }
        self.documents.lock().unwrap().push((
            collection.to_string(),
            id.to_string(),
            document.clone(),
        ));
        Ok(())
    }
}

// =============================================================================
// Flaky Patcher
// =============================================================================

/// Wraps a patcher and fails exactly one call (1-based) with a transient error.
pub struct FlakyPatcher {
    inner: Arc<dyn BaseLeadPatcher>,
    fail_on_call: usize,
    calls: AtomicUsize,
    fields: Arc<Mutex<Vec<String>>>,
}

impl FlakyPatcher {
    pub fn new(inner: Arc<dyn BaseLeadPatcher>, fail_on_call: usize) -> Self {
        Self {
            inner,
            fail_on_call,
            calls: AtomicUsize::new(0),
            fields: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Field names of every call, including the failed one.
    pub fn fields(&self) -> Vec<String> {
        self.fields.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseLeadPatcher for FlakyPatcher {
    async fn patch_field(
        &self,
        lead_id: Uuid,
        field: &str,
        value: serde_json::Value,
    ) -> std::result::Result<(), PatchError> {
        self.fields.lock().unwrap().push(field.to_string());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(PatchError::Unavailable("injected failure".to_string()));
        }
        self.inner.patch_field(lead_id, field, value).await
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// In-memory implementations behind every `ServerDeps` seam.
pub struct TestDependencies {
    pub lead_store: Arc<InMemoryLeadStore>,
    pub cursor_store: Arc<InMemoryCursorStore>,
    pub directory: Arc<MockDirectory>,
    pub bus: TestBus,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            lead_store: Arc::new(InMemoryLeadStore::new()),
            cursor_store: Arc::new(InMemoryCursorStore::new()),
            directory: Arc::new(MockDirectory::new()),
            bus: TestBus::new(),
        }
    }

    pub fn with_directory(mut self, directory: MockDirectory) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    pub fn with_cursor_store(mut self, cursor_store: InMemoryCursorStore) -> Self {
        self.cursor_store = Arc::new(cursor_store);
        self
    }

    /// Dependencies sharing this instance's store, directory and bus.
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps {
            lead_store: self.lead_store.clone(),
            cursor_store: self.cursor_store.clone(),
            directory: self.directory.clone(),
            bus: Arc::new(self.bus.clone()),
            page_delay: PageDelay::none(),
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
