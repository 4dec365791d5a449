//! Request pattern tracking and detection-risk scoring.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Weights and windows used to score recent request patterns.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// How long request history is kept at all.
    pub history: Duration,
    /// Window over which risk is scored.
    pub window: Duration,
    /// More requests than this inside the window look automated.
    pub burst_threshold: usize,
    pub burst_weight: f64,
    /// A mean gap below this between requests looks automated.
    pub min_mean_interval: Duration,
    pub cadence_weight: f64,
    /// More requests than this to one host inside the window.
    pub host_concentration_threshold: usize,
    pub concentration_weight: f64,
    /// Above this score identity rotation is recommended.
    pub rotate_threshold: f64,
    /// Above this score the browser is tried first.
    pub escalate_threshold: f64,
    /// More blocked hosts than this also recommends rotation.
    pub max_blocked_hosts: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            history: Duration::from_secs(3600),
            window: Duration::from_secs(300),
            burst_threshold: 20,
            burst_weight: 0.3,
            min_mean_interval: Duration::from_secs(2),
            cadence_weight: 0.4,
            host_concentration_threshold: 10,
            concentration_weight: 0.2,
            rotate_threshold: 0.6,
            escalate_threshold: 0.7,
            max_blocked_hosts: 3,
        }
    }
}

#[derive(Default)]
struct TrackerState {
    requests: VecDeque<(Instant, String)>,
    blocked: HashSet<String>,
    total: u64,
}

/// Rolling record of outbound requests and blocked hosts.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct RequestTracker {
    config: RiskConfig,
    state: Arc<Mutex<TrackerState>>,
}

impl RequestTracker {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(TrackerState::default())),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, host: &str) {
        self.record_at(host, Instant::now());
    }

    pub fn record_at(&self, host: &str, at: Instant) {
        let mut state = self.lock();
        state.requests.push_back((at, host.to_string()));
        state.total += 1;
        while let Some((oldest, _)) = state.requests.front() {
            if at.saturating_duration_since(*oldest) > self.config.history {
                state.requests.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn mark_blocked(&self, host: &str) {
        if self.lock().blocked.insert(host.to_string()) {
            tracing::warn!(host = %host, "Host marked as blocking");
        }
    }

    pub fn is_blocked(&self, host: &str) -> bool {
        self.lock().blocked.contains(host)
    }

    pub fn blocked_count(&self) -> usize {
        self.lock().blocked.len()
    }

    pub fn total_requests(&self) -> u64 {
        self.lock().total
    }

    /// Detection risk in `[0, 1]` for the current window.
    pub fn risk_score(&self) -> f64 {
        self.risk_score_at(Instant::now())
    }

    pub fn risk_score_at(&self, now: Instant) -> f64 {
        let cfg = &self.config;
        let state = self.lock();
        let recent: Vec<&(Instant, String)> = state
            .requests
            .iter()
            .filter(|(at, _)| now.saturating_duration_since(*at) <= cfg.window)
            .collect();

        let mut score = 0.0;
        if recent.len() > cfg.burst_threshold {
            score += cfg.burst_weight;
        }

        if recent.len() >= 2 {
            let first = recent[0].0;
            let last = recent[recent.len() - 1].0;
            let mean = last.saturating_duration_since(first) / (recent.len() as u32 - 1);
            if mean < cfg.min_mean_interval {
                score += cfg.cadence_weight;
            }
        }

        let mut per_host: HashMap<&str, usize> = HashMap::new();
        for (_, host) in &recent {
            *per_host.entry(host.as_str()).or_default() += 1;
        }
        if per_host
            .values()
            .any(|&count| count > cfg.host_concentration_threshold)
        {
            score += cfg.concentration_weight;
        }

        f64::min(score, 1.0)
    }

    pub fn should_rotate_identity(&self) -> bool {
        self.risk_score() > self.config.rotate_threshold
            || self.blocked_count() > self.config.max_blocked_hosts
    }
}
