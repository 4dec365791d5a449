use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::cache::CacheConfig;
use crate::classifier::ClassifierConfig;
use crate::error::AppError;
use crate::fetch::StrategyKind;
use crate::risk::RiskConfig;
use crate::throttle::ThrottleConfig;

/// Configured starting order of fetch strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    DirectOnly,
    ProxyFirst,
    TorFirst,
    #[default]
    Mixed,
    Aggressive,
}

impl RotationStrategy {
    /// Base order before risk and block history reorder it.
    pub fn base_order(&self) -> Vec<StrategyKind> {
        use StrategyKind::*;
        match self {
            RotationStrategy::DirectOnly => vec![Direct],
            RotationStrategy::ProxyFirst => vec![Proxy, Direct],
            RotationStrategy::TorFirst => vec![Tor, Proxy, Direct],
            RotationStrategy::Mixed => vec![Direct, Proxy, Tor],
            RotationStrategy::Aggressive => vec![Browser, Tor, Proxy, Direct],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RotationStrategy::DirectOnly => "direct",
            RotationStrategy::ProxyFirst => "proxy",
            RotationStrategy::TorFirst => "tor",
            RotationStrategy::Mixed => "mixed",
            RotationStrategy::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "direct_only" => Ok(RotationStrategy::DirectOnly),
            "proxy" | "free_proxy" | "proxy_first" => Ok(RotationStrategy::ProxyFirst),
            "tor" | "tor_first" => Ok(RotationStrategy::TorFirst),
            "mixed" => Ok(RotationStrategy::Mixed),
            "aggressive" => Ok(RotationStrategy::Aggressive),
            other => Err(AppError::ConfigError(format!(
                "Unknown rotation strategy '{other}' (expected direct, proxy, tor, mixed or aggressive)"
            ))),
        }
    }
}

/// Delay between attempts of one acquisition.
///
/// After a block the delay is `block_base * (attempt + 1)`; after a
/// transport error it is `error_base + error_step * attempt`. Both get
/// uniform random jitter in `[0, jitter]`.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub block_base: Duration,
    pub error_base: Duration,
    pub error_step: Duration,
    pub jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            block_base: Duration::from_secs(2),
            error_base: Duration::from_secs(1),
            error_step: Duration::from_millis(500),
            jitter: Duration::from_millis(1000),
        }
    }
}

impl BackoffConfig {
    /// No waiting at all; useful in tests.
    pub fn none() -> Self {
        Self {
            block_base: Duration::ZERO,
            error_base: Duration::ZERO,
            error_step: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Delay before the attempt following `attempt` (zero-based).
    pub fn delay(&self, attempt: u32, blocked: bool) -> Duration {
        let base = if blocked {
            self.block_base * (attempt + 1)
        } else {
            self.error_base + self.error_step * attempt
        };
        if self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}

/// Everything the orchestrator needs to know up front.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub strategy: RotationStrategy,
    /// Attempts per acquisition, including the first.
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    /// Upper bound for an attempt in challenge-solving mode.
    pub challenge_timeout: Duration,
    /// Period of keep-alive progress events during a long attempt.
    pub keep_alive_interval: Duration,
    pub throttle: ThrottleConfig,
    pub cache: CacheConfig,
    pub classifier: ClassifierConfig,
    pub risk: RiskConfig,
    pub backoff: BackoffConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            max_retries: 3,
            attempt_timeout: Duration::from_secs(25),
            challenge_timeout: Duration::from_secs(90),
            keep_alive_interval: Duration::from_secs(5),
            throttle: ThrottleConfig::default(),
            cache: CacheConfig::default(),
            classifier: ClassifierConfig::default(),
            risk: RiskConfig::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Configuration with every wait removed, for tests and offline tools.
    pub fn immediate() -> Self {
        Self::default()
            .with_throttle(ThrottleConfig::new(Duration::ZERO))
            .with_backoff(BackoffConfig::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_names() {
        assert_eq!(
            "free_proxy".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::ProxyFirst
        );
        assert_eq!(
            "Aggressive".parse::<RotationStrategy>().unwrap(),
            RotationStrategy::Aggressive
        );
        assert!("yolo".parse::<RotationStrategy>().is_err());
    }

    #[test]
    fn base_orders_keep_direct_as_fallback() {
        for strategy in [
            RotationStrategy::DirectOnly,
            RotationStrategy::ProxyFirst,
            RotationStrategy::TorFirst,
            RotationStrategy::Mixed,
            RotationStrategy::Aggressive,
        ] {
            assert!(strategy.base_order().contains(&StrategyKind::Direct));
        }
        assert_eq!(
            RotationStrategy::Aggressive.base_order()[0],
            StrategyKind::Browser
        );
    }

    #[test]
    fn backoff_grows_with_attempt() {
        let backoff = BackoffConfig {
            jitter: Duration::ZERO,
            ..BackoffConfig::default()
        };
        assert_eq!(backoff.delay(0, true), Duration::from_secs(2));
        assert_eq!(backoff.delay(2, true), Duration::from_secs(6));
        assert_eq!(backoff.delay(0, false), Duration::from_secs(1));
        assert_eq!(backoff.delay(2, false), Duration::from_secs(2));
    }

    #[test]
    fn backoff_jitter_is_bounded() {
        let backoff = BackoffConfig::default();
        for _ in 0..50 {
            let d = backoff.delay(1, true);
            assert!(d >= Duration::from_secs(4));
            assert!(d <= Duration::from_secs(5));
        }
    }

    #[test]
    fn immediate_config_has_no_waits() {
        let config = EngineConfig::immediate();
        assert!(config.throttle.min_interval.is_zero());
        assert_eq!(config.backoff.delay(5, true), Duration::ZERO);
    }
}
