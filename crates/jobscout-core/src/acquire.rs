use chrono::Utc;
use url::Url;
use uuid::Uuid;

use crate::error::{AcquisitionError, AppError};
use crate::fetch::FetchRequest;
use crate::merge::merge_records;
use crate::models::{JobPosting, NewPosting};
use crate::normalize::Normalizer;
use crate::orchestrator::Orchestrator;
use crate::progress::{AcquireEvent, ProgressReporter};
use crate::traits::{FetchExecutor, PostingStore, RecordExtractor};

/// Runs the full pipeline: acquire → extract → merge → normalize → save.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP or browsers.
pub struct AcquisitionService<E, X, S>
where
    E: FetchExecutor,
    X: RecordExtractor,
    S: PostingStore,
{
    orchestrator: Orchestrator<E>,
    extractor: X,
    normalizer: Normalizer,
    store: Option<S>,
}

impl<E, X, S> AcquisitionService<E, X, S>
where
    E: FetchExecutor,
    X: RecordExtractor,
    S: PostingStore,
{
    /// Create a new AcquisitionService without persistence.
    pub fn new(orchestrator: Orchestrator<E>, extractor: X) -> Self {
        Self {
            orchestrator,
            extractor,
            normalizer: Normalizer::default(),
            store: None,
        }
    }

    /// Create a new AcquisitionService that saves every posting.
    pub fn with_store(orchestrator: Orchestrator<E>, extractor: X, store: S) -> Self {
        Self {
            orchestrator,
            extractor,
            normalizer: Normalizer::default(),
            store: Some(store),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator<E> {
        &self.orchestrator
    }

    /// Acquire and standardize the job posting at `url`.
    ///
    /// Never panics and never returns anything but a posting or a
    /// structured [`AcquisitionError`].
    pub async fn acquire_job_posting<R: ProgressReporter>(
        &self,
        url: &str,
        correlation_id: Option<Uuid>,
        max_retries: Option<u32>,
        reporter: &R,
    ) -> Result<JobPosting, AcquisitionError> {
        let correlation_id = correlation_id.unwrap_or_else(Uuid::new_v4);
        reporter.report(AcquireEvent::Started {
            correlation_id,
            url,
        });

        let result = self
            .run(url, correlation_id, max_retries, reporter)
            .await;
        match &result {
            Ok(posting) => reporter.report(AcquireEvent::Completed {
                correlation_id,
                posting,
            }),
            Err(error) => reporter.report(AcquireEvent::Failed {
                correlation_id,
                error,
            }),
        }
        result
    }

    async fn run<R: ProgressReporter>(
        &self,
        url: &str,
        correlation_id: Uuid,
        max_retries: Option<u32>,
        reporter: &R,
    ) -> Result<JobPosting, AcquisitionError> {
        validate_target(url)?;

        let max_retries = max_retries.unwrap_or(self.orchestrator.config().max_retries);
        let request = FetchRequest::new(url, max_retries).with_correlation_id(correlation_id);
        let fetched = self.orchestrator.acquire(request, reporter).await?;

        let records = self.extractor.extract_all(&fetched.html, url);
        let fields: usize = records.iter().map(|r| r.len()).sum();
        reporter.report(AcquireEvent::Extracted {
            correlation_id,
            methods: records.iter().filter(|r| !r.is_empty()).count(),
            fields,
        });

        let merged = merge_records(records);
        let posting = self.normalizer.normalize(&merged, url, Utc::now());

        if let Some(store) = &self.store {
            match NewPosting::from_posting(posting.clone()) {
                Ok(new_posting) => match store.save(&new_posting).await {
                    Ok(id) => tracing::info!(%id, %correlation_id, "Posting saved"),
                    Err(e) => tracing::warn!(%correlation_id, error = %e, "Failed to save posting"),
                },
                Err(e) => tracing::warn!(%correlation_id, error = %e, "Failed to serialize posting"),
            }
        }

        Ok(posting)
    }

    /// Run extraction, merge and normalization over HTML already in hand.
    pub fn extract_posting(&self, html: &str, url: &str) -> JobPosting {
        let merged = merge_records(self.extractor.extract_all(html, url));
        self.normalizer.normalize(&merged, url, Utc::now())
    }
}

fn validate_target(url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::InvalidUrl(format!(
            "unsupported scheme '{scheme}' in {url}"
        ))),
    }
}
