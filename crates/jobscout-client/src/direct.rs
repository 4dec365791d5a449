use std::time::Duration;

use jobscout_core::error::AppError;
use jobscout_core::fetch::{FetchMode, RawResponse, StrategyKind};
use jobscout_core::traits::FetchExecutor;
use jobscout_core::util::host_of;
use reqwest::Client;

use crate::fingerprint::SessionFingerprints;
use crate::guard::validate_target;
use crate::http::{client_builder, get_page};
use crate::timing::HumanTiming;

/// Plain HTTP executor with per-domain fingerprints and human-like pauses.
///
/// By default, SSRF protection is **enabled**: requests to private/reserved
/// IP ranges are refused. Use [`allow_private_urls`](Self::allow_private_urls)
/// to disable it (e.g. for local fixtures).
#[derive(Clone)]
pub struct DirectExecutor {
    client: Client,
    fingerprints: SessionFingerprints,
    timing: HumanTiming,
    timeout: Duration,
    ssrf_protection: bool,
}

impl DirectExecutor {
    pub fn new(fingerprints: SessionFingerprints) -> Result<Self, AppError> {
        Self::with_timeout(fingerprints, Duration::from_secs(30))
    }

    pub fn with_timeout(fingerprints: SessionFingerprints, timeout: Duration) -> Result<Self, AppError> {
        let client = client_builder(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            fingerprints,
            timing: HumanTiming::default(),
            timeout,
            ssrf_protection: true,
        })
    }

    pub fn with_timing(mut self, timing: HumanTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }
}

impl FetchExecutor for DirectExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn prepare(&self, _url: &str, _mode: FetchMode) {
        self.timing.pause_before().await;
    }

    async fn fetch(&self, url: &str, _mode: FetchMode) -> Result<RawResponse, AppError> {
        if self.ssrf_protection {
            validate_target(url).await?;
        }
        let host = host_of(url).unwrap_or_default();
        let fingerprint = self.fingerprints.for_domain(&host);

        let response = get_page(&self.client, url, &fingerprint, self.timeout).await?;
        self.timing.pause_after().await;

        tracing::debug!(url, status = response.status, bytes = response.html.len(), "Direct fetch");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refuses_private_targets() {
        let executor = DirectExecutor::new(SessionFingerprints::new("t"))
            .unwrap()
            .with_timing(HumanTiming::none());
        let err = executor
            .fetch("http://127.0.0.1:9/jobs", FetchMode::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidUrl(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_closed_port_is_network_error() {
        let executor = DirectExecutor::with_timeout(SessionFingerprints::new("t"), Duration::from_secs(2))
            .unwrap()
            .with_timing(HumanTiming::none())
            .allow_private_urls();
        let err = executor
            .fetch("http://127.0.0.1:9/jobs", FetchMode::Normal)
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }
}
