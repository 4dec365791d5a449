//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::fetch::{FetchMode, RawResponse, StrategyKind};
use crate::models::{MethodKind, NewPosting};
use crate::progress::{AcquireEvent, ProgressReporter};
use crate::record::ExtractionRecord;
use crate::traits::{FetchExecutor, PostingStore, RecordExtractor};

/// A page long enough and bland enough to classify as real content.
pub const DEFAULT_PAGE: &str = "<html><head><title>Backend Engineer</title></head><body>\
<h1>Backend Engineer</h1><p>We are hiring a backend engineer to build and operate our \
hiring platform. You will work on APIs, data pipelines and internal tooling.</p></body></html>";

// ---------------------------------------------------------------------------
// MockExecutor
// ---------------------------------------------------------------------------

/// Mock executor with a scripted response queue.
#[derive(Clone)]
pub struct MockExecutor {
    kind: StrategyKind,
    available: bool,
    delay: Option<Duration>,
    /// Queue of responses. Each call pops the front element.
    /// If empty, returns [`DEFAULT_PAGE`] with status 200.
    responses: Arc<Mutex<VecDeque<Result<RawResponse, AppError>>>>,
    /// Every call as `(url, mode)`.
    pub calls: Arc<Mutex<Vec<(String, FetchMode)>>>,
}

impl MockExecutor {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            available: true,
            delay: None,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_responses(
        kind: StrategyKind,
        responses: Vec<Result<RawResponse, AppError>>,
    ) -> Self {
        let mock = Self::new(kind);
        mock.responses.lock().unwrap().extend(responses);
        mock
    }

    /// Returns `html` with status 200 on the first call.
    pub fn with_page(kind: StrategyKind, html: &str) -> Self {
        Self::with_responses(kind, vec![Ok(RawResponse::new(html, 200))])
    }

    pub fn unavailable(kind: StrategyKind) -> Self {
        Self {
            available: false,
            ..Self::new(kind)
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn modes(&self) -> Vec<FetchMode> {
        self.calls.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }
}

impl FetchExecutor for MockExecutor {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<RawResponse, AppError> {
        self.calls.lock().unwrap().push((url.to_string(), mode));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(RawResponse::new(DEFAULT_PAGE, 200)))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor that returns fixed records and counts calls.
#[derive(Clone, Default)]
pub struct MockExtractor {
    records: Vec<ExtractionRecord>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    pub fn new(records: Vec<ExtractionRecord>) -> Self {
        Self {
            records,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Extractor that finds nothing with every method.
    pub fn empty() -> Self {
        Self::new(MethodKind::ALL.iter().map(|m| ExtractionRecord::empty(*m)).collect())
    }
}

impl RecordExtractor for MockExtractor {
    fn extract_all(&self, _html: &str, url: &str) -> Vec<ExtractionRecord> {
        self.calls.lock().unwrap().push(url.to_string());
        self.records.clone()
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Reporter that records event names.
#[derive(Clone, Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<&'static str>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == name)
            .count()
    }
}

impl ProgressReporter for MockReporter {
    fn report(&self, event: AcquireEvent<'_>) {
        self.events.lock().unwrap().push(event.name());
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// Mock store that records saved postings.
#[derive(Clone, Default)]
pub struct MockStore {
    pub saved: Arc<Mutex<Vec<NewPosting>>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose next save fails.
    pub fn with_error(error: AppError) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl PostingStore for MockStore {
    async fn save(&self, posting: &NewPosting) -> Result<Uuid, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved.lock().unwrap().push(posting.clone());
        Ok(Uuid::new_v4())
    }
}
