//! Free-proxy pool and the proxied executor.

use std::collections::HashSet;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream;
use jobscout_core::error::AppError;
use jobscout_core::fetch::{FetchMode, RawResponse, StrategyKind};
use jobscout_core::traits::FetchExecutor;
use jobscout_core::util::host_of;
use rand::seq::SliceRandom;
use reqwest::{Client, Proxy};
use tokio::sync::{Mutex, RwLock};

use crate::fingerprint::SessionFingerprints;
use crate::guard::validate_target;
use crate::http::{client_builder, get_page, request_error};
use crate::timing::HumanTiming;

/// Raw `ip:port` lists fetched on every refresh.
pub const DEFAULT_PROXY_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/clarketm/proxy-list/master/proxy-list-raw.txt",
    "https://raw.githubusercontent.com/proxy4parsing/proxy-list/main/http.txt",
];

#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    pub sources: Vec<String>,
    /// Minimum time between refreshes.
    pub update_interval: Duration,
    pub probe_url: String,
    pub probe_timeout: Duration,
    pub probe_concurrency: usize,
    pub max_candidates: usize,
    pub max_pool_size: usize,
}

impl Default for ProxyPoolConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_PROXY_SOURCES.iter().map(|s| s.to_string()).collect(),
            update_interval: Duration::from_secs(30 * 60),
            probe_url: "http://httpbin.org/ip".to_string(),
            probe_timeout: Duration::from_secs(3),
            probe_concurrency: 20,
            max_candidates: 100,
            max_pool_size: 50,
        }
    }
}

impl ProxyPoolConfig {
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }
}

#[derive(Debug, Default)]
struct PoolState {
    proxies: Vec<String>,
    refreshed_at: Option<Instant>,
}

/// Validated proxies, handed out round-robin.
///
/// Refreshes run at most once per `update_interval` and never concurrently:
/// the refresh lock serializes them and late arrivals re-check staleness
/// after acquiring it.
#[derive(Clone)]
pub struct ProxyPool {
    config: Arc<ProxyPoolConfig>,
    client: Client,
    state: Arc<RwLock<PoolState>>,
    refresh_lock: Arc<Mutex<()>>,
    cursor: Arc<AtomicUsize>,
    exhausted: Arc<AtomicBool>,
}

impl ProxyPool {
    pub fn new(config: ProxyPoolConfig) -> Result<Self, AppError> {
        let client = client_builder(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            client,
            state: Arc::new(RwLock::new(PoolState::default())),
            refresh_lock: Arc::new(Mutex::new(())),
            cursor: Arc::new(AtomicUsize::new(0)),
            exhausted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A pool pre-filled with `proxies`, considered fresh as of now.
    pub fn with_proxies(config: ProxyPoolConfig, proxies: Vec<String>) -> Result<Self, AppError> {
        let mut pool = Self::new(config)?;
        pool.exhausted.store(proxies.is_empty(), Ordering::Relaxed);
        pool.state = Arc::new(RwLock::new(PoolState {
            proxies,
            refreshed_at: Some(Instant::now()),
        }));
        Ok(pool)
    }

    /// False once a refresh came back with nothing usable.
    pub fn has_proxies(&self) -> bool {
        !self.exhausted.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.proxies.len()
    }

    /// The next proxy in rotation, refreshing the pool first if it is stale.
    pub async fn next(&self) -> Option<String> {
        self.ensure_fresh().await;
        let state = self.state.read().await;
        if state.proxies.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % state.proxies.len();
        Some(state.proxies[index].clone())
    }

    /// Drop a proxy that just failed.
    pub async fn remove(&self, proxy: &str) {
        let mut state = self.state.write().await;
        state.proxies.retain(|p| p != proxy);
        if state.proxies.is_empty() {
            tracing::warn!("Proxy pool drained");
        }
    }

    async fn is_stale(&self) -> bool {
        let state = self.state.read().await;
        state
            .refreshed_at
            .is_none_or(|at| at.elapsed() >= self.config.update_interval)
    }

    /// Re-download the lists if the pool is older than the update interval.
    pub async fn ensure_fresh(&self) {
        if !self.is_stale().await {
            return;
        }
        let _guard = self.refresh_lock.lock().await;
        if !self.is_stale().await {
            return;
        }

        let proxies = self.refresh().await;
        tracing::info!(count = proxies.len(), "Proxy pool refreshed");
        self.exhausted.store(proxies.is_empty(), Ordering::Relaxed);
        let mut state = self.state.write().await;
        state.proxies = proxies;
        state.refreshed_at = Some(Instant::now());
    }

    async fn refresh(&self) -> Vec<String> {
        let downloads = self.config.sources.iter().map(|source| self.download(source));
        let lists = futures::future::join_all(downloads).await;

        let mut seen = HashSet::new();
        let mut candidates: Vec<String> = lists
            .iter()
            .flat_map(|list| parse_proxy_list(list))
            .filter(|p| seen.insert(p.clone()))
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(self.config.max_candidates);

        let probes: Vec<_> = candidates
            .into_iter()
            .map(|proxy| probe(proxy, self.config.probe_url.clone(), self.config.probe_timeout))
            .collect();
        let mut alive: Vec<String> = stream::iter(probes)
            .buffer_unordered(self.config.probe_concurrency.max(1))
            .collect::<Vec<Option<String>>>()
            .await
            .into_iter()
            .flatten()
            .collect();
        alive.truncate(self.config.max_pool_size);
        alive
    }

    async fn download(&self, source: &str) -> String {
        let result = async {
            self.client
                .get(source)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        }
        .await;
        match result {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(source, error = %e, "Proxy list download failed");
                String::new()
            }
        }
    }
}

/// `Some(proxy)` if a request through it reaches `probe_url` in time.
async fn probe(proxy: String, probe_url: String, timeout: Duration) -> Option<String> {
    let client = Proxy::all(format!("http://{proxy}"))
        .and_then(|p| Client::builder().proxy(p).timeout(timeout).build())
        .ok()?;
    let response = client.get(&probe_url).send().await.ok()?;
    response.status().is_success().then_some(proxy)
}

/// Parse newline-separated `ip:port` entries, skipping anything else.
pub fn parse_proxy_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_start_matches("http://"))
        .filter_map(|line| line.split_whitespace().next())
        .filter(|entry| entry.parse::<SocketAddrV4>().is_ok())
        .map(str::to_string)
        .collect()
}

/// Executor that sends each request through the next pooled proxy.
#[derive(Clone)]
pub struct ProxyExecutor {
    pool: ProxyPool,
    fingerprints: SessionFingerprints,
    timing: HumanTiming,
    timeout: Duration,
}

impl ProxyExecutor {
    pub fn new(pool: ProxyPool, fingerprints: SessionFingerprints) -> Self {
        Self {
            pool,
            fingerprints,
            timing: HumanTiming::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timing(mut self, timing: HumanTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }
}

impl FetchExecutor for ProxyExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Proxy
    }

    fn is_available(&self) -> bool {
        self.pool.has_proxies()
    }

    async fn prepare(&self, _url: &str, _mode: FetchMode) {
        self.pool.ensure_fresh().await;
        self.timing.pause_before().await;
    }

    async fn fetch(&self, url: &str, _mode: FetchMode) -> Result<RawResponse, AppError> {
        validate_target(url).await?;
        let proxy = self
            .pool
            .next()
            .await
            .ok_or_else(|| AppError::ExecutorUnavailable("proxy pool is empty".into()))?;

        let client = Proxy::all(format!("http://{proxy}"))
            .and_then(|p| client_builder(self.timeout).proxy(p).build())
            .map_err(|e| request_error(e, self.timeout))?;
        let fingerprint = self.fingerprints.for_domain(&host_of(url).unwrap_or_default());

        let result = get_page(&client, url, &fingerprint, self.timeout).await;
        self.timing.pause_after().await;

        match result {
            Ok(response) => {
                tracing::debug!(url, %proxy, status = response.status, "Proxied fetch");
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(url, %proxy, error = %e, "Dropping failed proxy");
                self.pool.remove(&proxy).await;
                Err(e)
            }
        }
    }
}
