use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::fetch::{FetchMode, RawResponse, StrategyKind};
use crate::models::NewPosting;
use crate::record::ExtractionRecord;

/// Retrieves a page through one acquisition channel.
///
/// Executors return whatever the server sent; deciding whether that
/// response is a block page is the classifier's job.
pub trait FetchExecutor: Send + Sync + Clone {
    fn kind(&self) -> StrategyKind;

    /// Whether the executor can be used at all (Tor daemon reachable, browser
    /// binary present, proxy pool non-empty, ...).
    fn is_available(&self) -> bool {
        true
    }

    /// Work done ahead of a request: pauses, identity rotation, pool refresh.
    ///
    /// Runs before the per-host rate-limit slot is taken, so nothing here
    /// delays the request once its slot is granted.
    fn prepare(&self, url: &str, mode: FetchMode) -> impl Future<Output = ()> + Send {
        let _ = (url, mode);
        async {}
    }

    fn fetch(
        &self,
        url: &str,
        mode: FetchMode,
    ) -> impl Future<Output = Result<RawResponse, AppError>> + Send;
}

/// Runs every extraction method over a document.
///
/// Returns one record per method, in any order. A method that fails
/// contributes an empty record instead of an error.
pub trait RecordExtractor: Send + Sync + Clone {
    fn extract_all(&self, html: &str, url: &str) -> Vec<ExtractionRecord>;
}

/// Persists normalized postings.
pub trait PostingStore: Send + Sync + Clone {
    /// Save a posting. Returns the generated UUID.
    fn save(&self, posting: &NewPosting) -> impl Future<Output = Result<Uuid, AppError>> + Send;
}

/// A no-op PostingStore for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullStore;

impl PostingStore for NullStore {
    async fn save(&self, _posting: &NewPosting) -> Result<Uuid, AppError> {
        Ok(Uuid::nil())
    }
}
