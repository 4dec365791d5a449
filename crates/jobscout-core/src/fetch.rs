//! Request/result types shared by the orchestrator and the executors.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// The closed set of fetch strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    Proxy,
    Tor,
    Browser,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Proxy => "proxy",
            StrategyKind::Tor => "tor",
            StrategyKind::Browser => "browser",
        }
    }

}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(StrategyKind::Direct),
            "proxy" => Ok(StrategyKind::Proxy),
            "tor" => Ok(StrategyKind::Tor),
            "browser" | "stealth_browser" => Ok(StrategyKind::Browser),
            other => Err(AppError::ConfigError(format!("Unknown strategy '{other}'"))),
        }
    }
}

/// How an executor should treat the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    #[default]
    Normal,
    /// Wait for an anti-bot interstitial to clear before returning.
    SolveChallenge,
}

/// What an executor hands back: the body and status, whatever they are.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub html: String,
    pub status: u16,
}

impl RawResponse {
    pub fn new(html: impl Into<String>, status: u16) -> Self {
        Self {
            html: html.into(),
            status,
        }
    }
}

/// One acquisition in flight.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub correlation_id: Uuid,
    pub attempt: u32,
    pub history: Vec<StrategyKind>,
    pub max_retries: u32,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, max_retries: u32) -> Self {
        Self {
            url: url.into(),
            correlation_id: Uuid::new_v4(),
            attempt: 0,
            history: Vec::new(),
            max_retries,
        }
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn attempts_left(&self) -> bool {
        self.attempt < self.max_retries.max(1)
    }
}

/// A page the orchestrator accepted.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub html: String,
    pub status: u16,
    pub strategy: StrategyKind,
    pub elapsed: Duration,
    pub from_cache: bool,
}

impl FetchResult {
    pub fn success(html: String, status: u16, strategy: StrategyKind, elapsed: Duration) -> Self {
        Self {
            html,
            status,
            strategy,
            elapsed,
            from_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_kind_parses_aliases() {
        assert_eq!("Direct".parse::<StrategyKind>().unwrap(), StrategyKind::Direct);
        assert_eq!(
            "stealth_browser".parse::<StrategyKind>().unwrap(),
            StrategyKind::Browser
        );
        assert!("carrier-pigeon".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn request_always_allows_one_attempt() {
        let req = FetchRequest::new("https://example.com", 0);
        assert!(req.attempts_left());
    }
}
