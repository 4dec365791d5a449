//! Strategy selection, retries and escalation for one acquisition.
//!
//! Each attempt goes `select → execute → classify`, then ends the
//! acquisition (success), or picks the next strategy and backs off. A
//! block never repeats the strategy that was blocked while another one is
//! still available; the classifier's remediation decides what comes next.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::{CachedPage, ResponseCache};
use crate::classifier::{BlockSignal, Remediation, ResponseClassifier};
use crate::config::{EngineConfig, RotationStrategy};
use crate::error::{AcquisitionError, AppError};
use crate::fetch::{FetchMode, FetchRequest, FetchResult, RawResponse, StrategyKind};
use crate::progress::{AcquireEvent, ProgressReporter};
use crate::risk::RequestTracker;
use crate::throttle::RateLimiter;
use crate::traits::FetchExecutor;
use crate::util::host_of;

/// Snapshot of engine state for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStats {
    pub total_requests: u64,
    pub strategy: String,
    pub cached_pages: u64,
    pub available_executors: Vec<StrategyKind>,
    pub blocked_domains: usize,
    pub risk_score: f64,
}

/// Owns the executors and all shared acquisition state.
///
/// Construct once per process and share by reference; every acquisition
/// goes through the same rate limiter, cache and request tracker.
pub struct Orchestrator<E: FetchExecutor> {
    executors: Vec<E>,
    limiter: RateLimiter,
    cache: ResponseCache,
    tracker: RequestTracker,
    classifier: ResponseClassifier,
    config: EngineConfig,
}

/// Mutable state of one acquisition across attempts.
#[derive(Default)]
struct AttemptState {
    blocked_kinds: Vec<StrategyKind>,
    preferred: Vec<StrategyKind>,
    last_signal: Option<BlockSignal>,
    last_error: Option<AppError>,
}

impl<E: FetchExecutor> Orchestrator<E> {
    pub fn new(executors: Vec<E>, config: EngineConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config.throttle.clone()),
            cache: ResponseCache::new(&config.cache),
            tracker: RequestTracker::new(config.risk.clone()),
            classifier: ResponseClassifier::new(config.classifier.clone()),
            executors,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ResponseClassifier {
        &self.classifier
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn strategy(&self) -> RotationStrategy {
        self.config.strategy
    }

    /// Kinds whose executor is currently usable.
    pub fn available_kinds(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<StrategyKind> = self
            .executors
            .iter()
            .filter(|e| e.is_available())
            .map(|e| e.kind())
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            total_requests: self.tracker.total_requests(),
            strategy: self.config.strategy.to_string(),
            cached_pages: self.cache.len(),
            available_executors: self.available_kinds(),
            blocked_domains: self.tracker.blocked_count(),
            risk_score: self.tracker.risk_score(),
        }
    }

    /// Strategy order for the next acquisition against `host`.
    ///
    /// Starts from the configured base order. Identity rotation pulls Tor
    /// forward, high risk puts the browser first and Tor second, and a host
    /// that blocked before goes straight to the browser. Unavailable
    /// executors are dropped; direct stays as the last resort.
    pub fn plan(&self, host: &str) -> Vec<StrategyKind> {
        let mut order = self.config.strategy.base_order();

        if self.tracker.should_rotate_identity() {
            promote(&mut order, StrategyKind::Tor);
        }
        if self.tracker.risk_score() > self.tracker.config().escalate_threshold {
            promote(&mut order, StrategyKind::Tor);
            promote(&mut order, StrategyKind::Browser);
        }
        if self.tracker.is_blocked(host) {
            promote(&mut order, StrategyKind::Browser);
        }

        let available = self.available_kinds();
        order.retain(|k| available.contains(k));
        if !order.contains(&StrategyKind::Direct) && available.contains(&StrategyKind::Direct) {
            order.push(StrategyKind::Direct);
        }
        if order.is_empty() {
            return available;
        }
        order
    }

    /// Acquire the page at `request.url`.
    ///
    /// Pages fetched within the cache TTL are served from the cache, and
    /// concurrent acquisitions of one URL share a single fetch sequence.
    pub async fn acquire<R: ProgressReporter>(
        &self,
        request: FetchRequest,
        reporter: &R,
    ) -> Result<FetchResult, AcquisitionError> {
        let started = Instant::now();
        let url = request.url.clone();
        let correlation_id = request.correlation_id;

        let mut fetched_here = false;
        let page = self
            .cache
            .get_or_fetch(&url, async {
                fetched_here = true;
                self.fetch_uncached(request, reporter).await
            })
            .await
            .map_err(|e| (*e).clone())?;

        if !fetched_here {
            reporter.report(AcquireEvent::CacheHit {
                correlation_id,
                url: &url,
            });
        }

        let CachedPage {
            html,
            status,
            strategy,
        } = page;
        let mut result = FetchResult::success(html, status, strategy, started.elapsed());
        result.from_cache = !fetched_here;
        Ok(result)
    }

    async fn fetch_uncached<R: ProgressReporter>(
        &self,
        mut request: FetchRequest,
        reporter: &R,
    ) -> Result<CachedPage, AcquisitionError> {
        let correlation_id = request.correlation_id;
        let host = host_of(&request.url)
            .ok_or_else(|| AppError::InvalidUrl(request.url.clone()))?;

        let available = self.available_kinds();
        if available.is_empty() {
            return Err(AppError::ExecutorUnavailable("no fetch executor is available".into()).into());
        }

        let mut state = AttemptState::default();

        while request.attempts_left() {
            let attempt = request.attempt;
            // Re-planned every attempt: a block on this host reorders it.
            let plan = self.plan(&host);
            tracing::debug!(%correlation_id, host = %host, attempt, ?plan, "Strategy plan");
            let kind = select_kind(&plan, &available, &request.history, &state);
            state.preferred.clear();

            let mode = if kind == StrategyKind::Browser
                && (state
                    .last_signal
                    .as_ref()
                    .is_some_and(|s| s.block_type.is_interstitial())
                    || self.tracker.is_blocked(&host))
            {
                FetchMode::SolveChallenge
            } else {
                FetchMode::Normal
            };

            reporter.report(AcquireEvent::AttemptStarted {
                correlation_id,
                attempt,
                strategy: kind,
                mode,
            });

            let outcome = match self.executor(kind) {
                Some(executor) => {
                    executor.prepare(&request.url, mode).await;
                    self.limiter.acquire(&host).await;
                    self.tracker.record(&host);
                    self.run_attempt(executor, &request.url, mode, correlation_id, reporter)
                        .await
                }
                None => Err(AppError::ExecutorUnavailable(kind.to_string())),
            };
            request.history.push(kind);
            request.attempt += 1;

            let blocked = match outcome {
                Ok(raw) => match self.classifier.classify(&raw.html, raw.status, &request.url) {
                    None => {
                        reporter.report(AcquireEvent::Fetched {
                            correlation_id,
                            strategy: kind,
                            status: raw.status,
                            bytes: raw.html.len(),
                        });
                        return Ok(CachedPage {
                            html: raw.html,
                            status: raw.status,
                            strategy: kind,
                        });
                    }
                    Some(signal) => {
                        self.on_block(&host, kind, signal, &mut state, correlation_id, reporter);
                        true
                    }
                },
                Err(AppError::Blocked(signal)) => {
                    self.on_block(&host, kind, signal, &mut state, correlation_id, reporter);
                    true
                }
                Err(err) => {
                    reporter.report(AcquireEvent::AttemptFailed {
                        correlation_id,
                        strategy: kind,
                        error: &err,
                    });
                    let fatal = !err.is_retryable();
                    state.last_error = Some(err);
                    if fatal {
                        break;
                    }
                    false
                }
            };

            if request.attempts_left() {
                let delay = self.config.backoff.delay(attempt, blocked);
                if !delay.is_zero() {
                    reporter.report(AcquireEvent::Backoff {
                        correlation_id,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(failure(&request, state))
    }

    fn on_block<R: ProgressReporter>(
        &self,
        host: &str,
        kind: StrategyKind,
        signal: BlockSignal,
        state: &mut AttemptState,
        correlation_id: uuid::Uuid,
        reporter: &R,
    ) {
        reporter.report(AcquireEvent::Blocked {
            correlation_id,
            strategy: kind,
            signal: &signal,
        });
        self.tracker.mark_blocked(host);
        if !state.blocked_kinds.contains(&kind) {
            state.blocked_kinds.push(kind);
        }
        state.preferred = match signal.remediation {
            Remediation::UseBrowser => vec![StrategyKind::Browser],
            Remediation::RotateIdentity => vec![StrategyKind::Tor, StrategyKind::Proxy],
            Remediation::SwitchStrategy => Vec::new(),
        };
        state.last_signal = Some(signal);
    }

    fn executor(&self, kind: StrategyKind) -> Option<&E> {
        self.executors
            .iter()
            .find(|e| e.kind() == kind && e.is_available())
    }

    /// One executor call under the attempt timeout, with keep-alive events
    /// while it runs.
    async fn run_attempt<R: ProgressReporter>(
        &self,
        executor: &E,
        url: &str,
        mode: FetchMode,
        correlation_id: uuid::Uuid,
        reporter: &R,
    ) -> Result<RawResponse, AppError> {
        let limit = match mode {
            FetchMode::SolveChallenge => self.config.challenge_timeout,
            FetchMode::Normal => self.config.attempt_timeout,
        };
        let strategy = executor.kind();
        let fetch = tokio::time::timeout(limit, executor.fetch(url, mode));
        tokio::pin!(fetch);

        let every = self.config.keep_alive_interval;
        if every.is_zero() {
            return fetch.await.unwrap_or(Err(timeout_error(limit)));
        }

        let started = Instant::now();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        loop {
            tokio::select! {
                result = &mut fetch => {
                    return result.unwrap_or(Err(timeout_error(limit)));
                }
                _ = ticker.tick() => {
                    reporter.report(AcquireEvent::KeepAlive {
                        correlation_id,
                        strategy,
                        elapsed: started.elapsed(),
                    });
                }
            }
        }
    }
}

fn timeout_error(limit: Duration) -> AppError {
    AppError::Timeout(limit.as_secs())
}

/// Move `kind` to the front of `order`, inserting it if absent.
fn promote(order: &mut Vec<StrategyKind>, kind: StrategyKind) {
    order.retain(|k| *k != kind);
    order.insert(0, kind);
}

/// Choose the strategy for the next attempt.
///
/// 1. The remediation's preference, if available and not already blocked.
/// 2. The first planned strategy not tried yet.
/// 3. The planned strategy after the last one used, skipping blocked ones.
/// 4. Whatever is left (only blocked strategies remain).
fn select_kind(
    plan: &[StrategyKind],
    available: &[StrategyKind],
    history: &[StrategyKind],
    state: &AttemptState,
) -> StrategyKind {
    if let Some(kind) = state
        .preferred
        .iter()
        .find(|k| available.contains(k) && !state.blocked_kinds.contains(k))
    {
        return *kind;
    }
    if let Some(kind) = plan.iter().find(|k| !history.contains(k)) {
        return *kind;
    }

    let start = history
        .last()
        .and_then(|last| plan.iter().position(|k| k == last))
        .map(|i| i + 1)
        .unwrap_or(0);
    let rotated = plan.iter().cycle().skip(start).take(plan.len());
    let mut fallback = None;
    for kind in rotated {
        if !state.blocked_kinds.contains(kind) {
            return *kind;
        }
        fallback.get_or_insert(*kind);
    }
    fallback.unwrap_or(StrategyKind::Direct)
}

fn failure(request: &FetchRequest, state: AttemptState) -> AcquisitionError {
    let tried = request
        .history
        .iter()
        .map(StrategyKind::as_str)
        .collect::<Vec<_>>()
        .join(" → ");
    match (state.last_signal, state.last_error) {
        (Some(signal), _) => AcquisitionError::from_signal(
            &signal,
            format!(
                "Blocked ({}) after {} attempt(s) [{tried}]",
                signal.block_type, request.attempt
            ),
        ),
        (None, Some(err)) => {
            let mut failure = AcquisitionError::from_error(&err);
            failure.message = format!(
                "{} after {} attempt(s) [{tried}]",
                failure.message, request.attempt
            );
            failure
        }
        (None, None) => AcquisitionError::from_error(&AppError::Generic(
            "no attempt was made".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BlockType;
    use crate::testutil::{MockExecutor, MockReporter};
    use crate::throttle::ThrottleConfig;
    use std::sync::Arc;

    const CHALLENGE_PAGE: &str = "<html><head><title>Just a moment...</title></head><body>\
        <form id=\"challenge-form\" action=\"/cdn-cgi/l/chk_jschl\"><input name=\"jschl_vc\"></form>\
        <p>Please enable JavaScript and cookies to continue</p></body></html>";

    fn orchestrator(executors: Vec<MockExecutor>, strategy: RotationStrategy) -> Orchestrator<MockExecutor> {
        let config = EngineConfig::immediate()
            .with_strategy(strategy)
            .with_keep_alive_interval(Duration::ZERO);
        Orchestrator::new(executors, config)
    }

    fn request(url: &str) -> FetchRequest {
        FetchRequest::new(url, 3)
    }

    #[tokio::test]
    async fn first_strategy_success() {
        let direct = MockExecutor::new(StrategyKind::Direct);
        let orch = orchestrator(vec![direct.clone()], RotationStrategy::Mixed);

        let result = orch
            .acquire(request("https://jobs.example.com/1"), &MockReporter::new())
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.strategy, StrategyKind::Direct);
        assert!(!result.from_cache);
        assert_eq!(direct.call_count(), 1);
        assert_eq!(orch.stats().total_requests, 1);
    }

    #[tokio::test]
    async fn second_acquire_within_ttl_is_served_from_cache() {
        let direct = MockExecutor::new(StrategyKind::Direct);
        let orch = orchestrator(vec![direct.clone()], RotationStrategy::DirectOnly);
        let reporter = MockReporter::new();

        let first = orch.acquire(request("https://a.com/job"), &reporter).await.unwrap();
        let second = orch.acquire(request("https://a.com/job"), &reporter).await.unwrap();

        assert_eq!(direct.call_count(), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.html, second.html);
        assert_eq!(reporter.count("cache_hit"), 1);
    }

    #[tokio::test]
    async fn concurrent_acquires_share_one_fetch() {
        let direct = MockExecutor::new(StrategyKind::Direct).with_delay(Duration::from_millis(50));
        let orch = orchestrator(vec![direct.clone()], RotationStrategy::DirectOnly);
        let reporter = MockReporter::new();

        let (a, b) = tokio::join!(
            orch.acquire(request("https://a.com/job"), &reporter),
            orch.acquire(request("https://a.com/job"), &reporter),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(direct.call_count(), 1);
    }

    #[tokio::test]
    async fn access_block_rotates_identity() {
        let direct = MockExecutor::with_responses(
            StrategyKind::Direct,
            vec![Ok(RawResponse::new("", 403))],
        );
        let proxy = MockExecutor::new(StrategyKind::Proxy);
        let orch = orchestrator(vec![direct.clone(), proxy.clone()], RotationStrategy::Mixed);
        let reporter = MockReporter::new();

        let result = orch.acquire(request("https://b.com/job"), &reporter).await.unwrap();

        assert_eq!(result.strategy, StrategyKind::Proxy);
        assert_eq!(direct.call_count(), 1);
        assert_eq!(proxy.call_count(), 1);
        assert_eq!(reporter.count("blocked"), 1);
        assert!(orch.tracker().is_blocked("b.com"));
    }

    #[tokio::test]
    async fn javascript_challenge_escalates_to_browser_challenge_mode() {
        let direct = MockExecutor::with_page(StrategyKind::Direct, CHALLENGE_PAGE);
        let proxy = MockExecutor::new(StrategyKind::Proxy);
        let browser = MockExecutor::new(StrategyKind::Browser);
        let orch = orchestrator(
            vec![direct.clone(), proxy.clone(), browser.clone()],
            RotationStrategy::Mixed,
        );

        let result = orch
            .acquire(request("https://c.com/job"), &MockReporter::new())
            .await
            .unwrap();

        assert_eq!(result.strategy, StrategyKind::Browser);
        assert_eq!(proxy.call_count(), 0);
        assert_eq!(browser.modes(), vec![FetchMode::SolveChallenge]);
    }

    #[tokio::test]
    async fn exhausted_attempts_report_last_block() {
        let blocked = || Ok(RawResponse::new("", 403));
        let direct = MockExecutor::with_responses(
            StrategyKind::Direct,
            vec![blocked(), blocked(), blocked()],
        );
        let orch = orchestrator(vec![direct.clone()], RotationStrategy::DirectOnly);
        let reporter = MockReporter::new();

        let err = orch
            .acquire(request("https://d.com/job"), &reporter)
            .await
            .unwrap_err();

        assert!(err.blocked);
        assert_eq!(err.block_type, Some(BlockType::HttpStatus));
        assert_eq!(err.confidence, Some(0.9));
        assert_eq!(err.http_status, Some(403));
        assert_eq!(direct.call_count(), 3);
        assert_eq!(reporter.count("attempt_started"), 3);
    }

    #[tokio::test]
    async fn network_error_rotates_to_next_strategy() {
        let direct = MockExecutor::with_responses(
            StrategyKind::Direct,
            vec![Err(AppError::NetworkError("connection reset".into()))],
        );
        let proxy = MockExecutor::new(StrategyKind::Proxy);
        let orch = orchestrator(vec![direct.clone(), proxy.clone()], RotationStrategy::Mixed);

        let result = orch
            .acquire(request("https://e.com/job"), &MockReporter::new())
            .await
            .unwrap();

        assert_eq!(result.strategy, StrategyKind::Proxy);
        assert!(!orch.tracker().is_blocked("e.com"));
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let direct = MockExecutor::with_responses(
            StrategyKind::Direct,
            vec![Err(AppError::InvalidUrl("ftp://x".into()))],
        );
        let orch = orchestrator(vec![direct.clone()], RotationStrategy::DirectOnly);

        let err = orch
            .acquire(request("https://f.com/job"), &MockReporter::new())
            .await
            .unwrap_err();

        assert!(!err.blocked);
        assert_eq!(direct.call_count(), 1);
        assert!(err.message.contains("Invalid URL"));
    }

    #[tokio::test]
    async fn blocked_host_goes_to_browser_first() {
        let direct = MockExecutor::with_responses(
            StrategyKind::Direct,
            vec![Ok(RawResponse::new("", 429))],
        );
        let browser = MockExecutor::new(StrategyKind::Browser);
        let orch = orchestrator(vec![direct.clone(), browser.clone()], RotationStrategy::Mixed);

        orch.acquire(request("https://g.com/1"), &MockReporter::new())
            .await
            .unwrap();
        assert_eq!(orch.plan("g.com")[0], StrategyKind::Browser);

        let result = orch
            .acquire(request("https://g.com/2"), &MockReporter::new())
            .await
            .unwrap();
        assert_eq!(result.strategy, StrategyKind::Browser);
        assert_eq!(direct.call_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_executors_are_skipped() {
        let tor = MockExecutor::unavailable(StrategyKind::Tor);
        let direct = MockExecutor::new(StrategyKind::Direct);
        let orch = orchestrator(vec![tor.clone(), direct.clone()], RotationStrategy::TorFirst);

        assert_eq!(orch.plan("h.com"), vec![StrategyKind::Direct]);
        let result = orch
            .acquire(request("https://h.com/job"), &MockReporter::new())
            .await
            .unwrap();
        assert_eq!(result.strategy, StrategyKind::Direct);
        assert_eq!(tor.call_count(), 0);
    }

    #[tokio::test]
    async fn no_executor_is_a_structured_failure() {
        let orch = orchestrator(vec![MockExecutor::unavailable(StrategyKind::Direct)], RotationStrategy::Mixed);
        let err = orch
            .acquire(request("https://i.com/job"), &MockReporter::new())
            .await
            .unwrap_err();
        assert!(!err.blocked);
        assert!(err.message.contains("unavailable"));
    }

    #[tokio::test]
    async fn slow_attempt_emits_keep_alive_and_times_out() {
        let direct = MockExecutor::new(StrategyKind::Direct).with_delay(Duration::from_millis(300));
        let config = EngineConfig::immediate()
            .with_strategy(RotationStrategy::DirectOnly)
            .with_attempt_timeout(Duration::from_millis(120))
            .with_keep_alive_interval(Duration::from_millis(25));
        let orch = Orchestrator::new(vec![direct], config);
        let reporter = MockReporter::new();

        let err = orch
            .acquire(FetchRequest::new("https://j.com/job", 1), &reporter)
            .await
            .unwrap_err();

        assert!(!err.blocked);
        assert!(err.message.contains("timed out"));
        assert!(reporter.count("keep_alive") >= 2);
        assert_eq!(reporter.count("attempt_failed"), 1);
    }

    #[tokio::test]
    async fn invalid_url_fails_without_fetching() {
        let direct = MockExecutor::new(StrategyKind::Direct);
        let orch = orchestrator(vec![direct.clone()], RotationStrategy::DirectOnly);
        let err = orch
            .acquire(request("not a url"), &MockReporter::new())
            .await
            .unwrap_err();
        assert!(!err.blocked);
        assert_eq!(direct.call_count(), 0);
    }

    /// Waits `<path>` milliseconds in `prepare`, records when `fetch` starts.
    #[derive(Clone, Default)]
    struct SlowPrepareExecutor {
        sent: Arc<std::sync::Mutex<Vec<tokio::time::Instant>>>,
    }

    impl FetchExecutor for SlowPrepareExecutor {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Direct
        }

        async fn prepare(&self, url: &str, _mode: FetchMode) {
            let ms = url.rsplit('/').next().and_then(|p| p.parse().ok()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        async fn fetch(&self, _url: &str, _mode: FetchMode) -> Result<RawResponse, AppError> {
            self.sent.lock().unwrap().push(tokio::time::Instant::now());
            Ok(RawResponse::new(crate::testutil::DEFAULT_PAGE, 200))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn preparation_delay_does_not_eat_into_host_spacing() {
        let executor = SlowPrepareExecutor::default();
        let interval = Duration::from_millis(300);
        let config = EngineConfig::immediate()
            .with_strategy(RotationStrategy::DirectOnly)
            .with_throttle(ThrottleConfig::new(interval))
            .with_keep_alive_interval(Duration::ZERO);
        let orch = Orchestrator::new(vec![executor.clone()], config);
        let reporter = MockReporter::new();

        let (a, b, c, d) = tokio::join!(
            orch.acquire(request("https://jobs.example.com/400"), &reporter),
            orch.acquire(request("https://jobs.example.com/0"), &reporter),
            orch.acquire(request("https://jobs.example.com/200"), &reporter),
            orch.acquire(request("https://jobs.example.com/100"), &reporter),
        );
        for result in [a, b, c, d] {
            result.unwrap();
        }

        let mut sent = executor.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent.len(), 4);
        for pair in sent.windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap {:?}", pair[1] - pair[0]);
        }
    }

    #[test]
    fn selection_never_repeats_a_blocked_strategy_with_alternatives() {
        let plan = [StrategyKind::Direct, StrategyKind::Proxy, StrategyKind::Tor];
        let state = AttemptState {
            blocked_kinds: vec![StrategyKind::Direct, StrategyKind::Proxy],
            ..AttemptState::default()
        };
        let history = [StrategyKind::Direct, StrategyKind::Proxy, StrategyKind::Tor];
        assert_eq!(
            select_kind(&plan, &plan, &history, &state),
            StrategyKind::Tor
        );
    }

    #[test]
    fn promote_inserts_missing_kinds() {
        let mut order = RotationStrategy::DirectOnly.base_order();
        promote(&mut order, StrategyKind::Browser);
        assert_eq!(order, vec![StrategyKind::Browser, StrategyKind::Direct]);
    }
}
