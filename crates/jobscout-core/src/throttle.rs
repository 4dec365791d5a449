//! Per-host request spacing.
//!
//! [`RateLimiter::acquire`] hands out start slots per host: each caller is
//! given `max(now, previous_slot + interval)` under the lock and then sleeps
//! until its slot outside the lock. Concurrent callers for the same host are
//! therefore spaced at least `min_interval` apart, while callers for other
//! hosts never wait on each other.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use jobscout_core::throttle::{RateLimiter, ThrottleConfig};
//!
//! # async fn run() {
//! let limiter = RateLimiter::new(
//!     ThrottleConfig::new(Duration::from_millis(1500)).with_jitter(Duration::from_millis(250)),
//! );
//! limiter.acquire("jobs.lever.co").await;
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum delay between consecutive requests to the same host.
    pub min_interval: Duration,

    /// Maximum random jitter added on top of `min_interval` (uniform [0, jitter]).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub jitter: Duration,
}

impl ThrottleConfig {
    /// Create a new config with the given per-host interval and no jitter.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            jitter: Duration::ZERO,
        }
    }

    /// Add random jitter (uniform [0, jitter]) on top of the base interval.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Compute the spacing for a single slot (interval + random jitter).
    fn effective_interval(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.min_interval;
        }
        let max_ms = self.jitter.as_millis() as u64;
        self.min_interval + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

impl Default for ThrottleConfig {
    /// 1.5 second interval, no jitter.
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

/// Shared per-host limiter. Clones share state.
#[derive(Clone)]
pub struct RateLimiter {
    config: ThrottleConfig,
    /// Start time of the most recently granted slot per host.
    slots: Arc<Mutex<HashMap<String, Instant>>>,
}

impl RateLimiter {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Block until this caller may start a request to `host`.
    pub async fn acquire(&self, host: &str) {
        let slot = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let slot = match slots.get(host) {
                Some(&previous) => (previous + self.config.effective_interval()).max(now),
                None => now,
            };
            slots.insert(host.to_string(), slot);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(host = %host, sleep_ms = %wait.as_millis(), "Throttling request");
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_interval_without_jitter() {
        let config = ThrottleConfig::new(Duration::from_secs(1));
        assert_eq!(config.effective_interval(), Duration::from_secs(1));
    }

    #[test]
    fn effective_interval_with_jitter_is_bounded() {
        let config =
            ThrottleConfig::new(Duration::from_millis(100)).with_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            let d = config.effective_interval();
            assert!(d >= Duration::from_millis(100));
            assert!(d < Duration::from_millis(150));
        }
    }

    #[tokio::test]
    async fn enforces_interval_on_same_host() {
        let limiter = RateLimiter::new(ThrottleConfig::new(Duration::from_millis(100)));

        let start = Instant::now();
        limiter.acquire("example.com").await;
        limiter.acquire("example.com").await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(100),
            "Second request should have been delayed by at least 100ms, elapsed: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn does_not_delay_different_hosts() {
        let limiter = RateLimiter::new(ThrottleConfig::new(Duration::from_millis(200)));

        let start = Instant::now();
        limiter.acquire("example.com").await;
        limiter.acquire("other.com").await;
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(150),
            "Different hosts should not be throttled against each other, elapsed: {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced() {
        let limiter = RateLimiter::new(ThrottleConfig::new(Duration::from_millis(1500)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire("boards.greenhouse.io").await;
                Instant::now()
            }));
        }

        let mut started = Vec::new();
        for handle in handles {
            started.push(handle.await.unwrap());
        }
        started.sort();

        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1500));
        }
        assert!(started[3] - start >= Duration::from_millis(4500));
    }

    #[test]
    fn sub_millisecond_jitter_adds_nothing() {
        let config = ThrottleConfig::new(Duration::from_millis(10)).with_jitter(Duration::from_micros(500));
        for _ in 0..10 {
            assert_eq!(config.effective_interval(), Duration::from_millis(10));
        }
    }

    #[test]
    fn default_config_is_polite() {
        let config = ThrottleConfig::default();
        assert_eq!(config.min_interval, Duration::from_millis(1500));
        assert!(config.jitter.is_zero());
    }
}
