//! The concrete executor set and its startup detection.

use std::time::Duration;

use jobscout_core::error::AppError;
use jobscout_core::fetch::{FetchMode, RawResponse, StrategyKind};
use jobscout_core::traits::FetchExecutor;

#[cfg(feature = "browser")]
use crate::browser::{BrowserConfig, BrowserExecutor};
use crate::direct::DirectExecutor;
use crate::fingerprint::SessionFingerprints;
use crate::proxy::{ProxyExecutor, ProxyPool, ProxyPoolConfig};
use crate::timing::HumanTiming;
use crate::tor::{TorConfig, TorController, TorExecutor};

/// One of the acquisition channels, behind a single type so the
/// orchestrator can hold a heterogeneous list.
#[derive(Clone)]
pub enum Executor {
    Direct(DirectExecutor),
    Proxy(ProxyExecutor),
    Tor(TorExecutor),
    #[cfg(feature = "browser")]
    Browser(BrowserExecutor),
}

impl FetchExecutor for Executor {
    fn kind(&self) -> StrategyKind {
        match self {
            Self::Direct(e) => e.kind(),
            Self::Proxy(e) => e.kind(),
            Self::Tor(e) => e.kind(),
            #[cfg(feature = "browser")]
            Self::Browser(e) => e.kind(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            Self::Direct(e) => e.is_available(),
            Self::Proxy(e) => e.is_available(),
            Self::Tor(e) => e.is_available(),
            #[cfg(feature = "browser")]
            Self::Browser(e) => e.is_available(),
        }
    }

    async fn prepare(&self, url: &str, mode: FetchMode) {
        match self {
            Self::Direct(e) => e.prepare(url, mode).await,
            Self::Proxy(e) => e.prepare(url, mode).await,
            Self::Tor(e) => e.prepare(url, mode).await,
            #[cfg(feature = "browser")]
            Self::Browser(e) => e.prepare(url, mode).await,
        }
    }

    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<RawResponse, AppError> {
        match self {
            Self::Direct(e) => e.fetch(url, mode).await,
            Self::Proxy(e) => e.fetch(url, mode).await,
            Self::Tor(e) => e.fetch(url, mode).await,
            #[cfg(feature = "browser")]
            Self::Browser(e) => e.fetch(url, mode).await,
        }
    }
}

/// What to try bringing up at startup.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// `None` disables the proxy executor.
    pub proxy: Option<ProxyPoolConfig>,
    /// `None` skips Tor detection.
    pub tor: Option<TorConfig>,
    #[cfg(feature = "browser")]
    pub browser: Option<BrowserConfig>,
    pub request_timeout: Duration,
    pub timing: HumanTiming,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            proxy: Some(ProxyPoolConfig::default()),
            tor: Some(TorConfig::default()),
            #[cfg(feature = "browser")]
            browser: Some(BrowserConfig::default()),
            request_timeout: Duration::from_secs(30),
            timing: HumanTiming::default(),
        }
    }
}

impl ExecutorSettings {
    /// Direct only, no pauses.
    pub fn direct_only() -> Self {
        Self {
            proxy: None,
            tor: None,
            #[cfg(feature = "browser")]
            browser: None,
            request_timeout: Duration::from_secs(30),
            timing: HumanTiming::none(),
        }
    }
}

/// Build every executor that can work in this environment.
///
/// Direct is always present. Proxy needs at least one list source, Tor
/// needs a reachable control port and the browser needs a launchable
/// Chromium; anything missing is logged and left out.
pub async fn detect_executors(
    settings: ExecutorSettings,
    fingerprints: SessionFingerprints,
) -> Result<Vec<Executor>, AppError> {
    let mut executors = vec![Executor::Direct(
        DirectExecutor::with_timeout(fingerprints.clone(), settings.request_timeout)?
            .with_timing(settings.timing.clone()),
    )];

    if let Some(config) = settings.proxy.filter(|c| !c.sources.is_empty()) {
        let pool = ProxyPool::new(config)?;
        executors.push(Executor::Proxy(
            ProxyExecutor::new(pool, fingerprints.clone())
                .with_timing(settings.timing.clone())
                .with_timeout(settings.request_timeout),
        ));
    }

    if let Some(config) = settings.tor
        && let Some(controller) = TorController::detect(config).await
    {
        match TorExecutor::new(controller, fingerprints.clone(), settings.request_timeout) {
            Ok(tor) => executors.push(Executor::Tor(tor)),
            Err(e) => tracing::warn!(error = %e, "Tor executor disabled"),
        }
    }

    #[cfg(feature = "browser")]
    if let Some(config) = settings.browser {
        match BrowserExecutor::launch(config, fingerprints.clone()).await {
            Ok(browser) => executors.push(Executor::Browser(browser)),
            Err(e) => tracing::warn!(error = %e, "Browser executor disabled"),
        }
    }

    let kinds: Vec<&str> = executors.iter().map(|e| e.kind().as_str()).collect();
    tracing::info!(executors = ?kinds, "Executors ready");
    Ok(executors)
}
