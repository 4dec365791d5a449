use std::time::Duration;

use uuid::Uuid;

use crate::classifier::BlockSignal;
use crate::error::{AcquisitionError, AppError};
use crate::fetch::{FetchMode, StrategyKind};
use crate::models::JobPosting;

/// Coarse progress events emitted while acquiring a posting.
#[derive(Debug, Clone)]
pub enum AcquireEvent<'a> {
    Started {
        correlation_id: Uuid,
        url: &'a str,
    },
    CacheHit {
        correlation_id: Uuid,
        url: &'a str,
    },
    AttemptStarted {
        correlation_id: Uuid,
        attempt: u32,
        strategy: StrategyKind,
        mode: FetchMode,
    },
    /// Emitted periodically while a long attempt is still running.
    KeepAlive {
        correlation_id: Uuid,
        strategy: StrategyKind,
        elapsed: Duration,
    },
    Blocked {
        correlation_id: Uuid,
        strategy: StrategyKind,
        signal: &'a BlockSignal,
    },
    AttemptFailed {
        correlation_id: Uuid,
        strategy: StrategyKind,
        error: &'a AppError,
    },
    Backoff {
        correlation_id: Uuid,
        delay: Duration,
    },
    Fetched {
        correlation_id: Uuid,
        strategy: StrategyKind,
        status: u16,
        bytes: usize,
    },
    Extracted {
        correlation_id: Uuid,
        methods: usize,
        fields: usize,
    },
    Completed {
        correlation_id: Uuid,
        posting: &'a JobPosting,
    },
    Failed {
        correlation_id: Uuid,
        error: &'a AcquisitionError,
    },
}

impl AcquireEvent<'_> {
    /// Short stable name, e.g. for SSE event types.
    pub fn name(&self) -> &'static str {
        match self {
            AcquireEvent::Started { .. } => "started",
            AcquireEvent::CacheHit { .. } => "cache_hit",
            AcquireEvent::AttemptStarted { .. } => "attempt_started",
            AcquireEvent::KeepAlive { .. } => "keep_alive",
            AcquireEvent::Blocked { .. } => "blocked",
            AcquireEvent::AttemptFailed { .. } => "attempt_failed",
            AcquireEvent::Backoff { .. } => "backoff",
            AcquireEvent::Fetched { .. } => "fetched",
            AcquireEvent::Extracted { .. } => "extracted",
            AcquireEvent::Completed { .. } => "completed",
            AcquireEvent::Failed { .. } => "failed",
        }
    }
}

/// Sink for acquisition progress (decoupled logging, SSE bridges, ...).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: AcquireEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: AcquireEvent<'_>) {
        match event {
            AcquireEvent::Started {
                correlation_id,
                url,
            } => {
                tracing::info!(%correlation_id, %url, "Acquisition started");
            }
            AcquireEvent::CacheHit {
                correlation_id,
                url,
            } => {
                tracing::debug!(%correlation_id, %url, "Served from cache");
            }
            AcquireEvent::AttemptStarted {
                correlation_id,
                attempt,
                strategy,
                mode,
            } => {
                tracing::info!(%correlation_id, attempt, %strategy, ?mode, "Attempt started");
            }
            AcquireEvent::KeepAlive {
                correlation_id,
                strategy,
                elapsed,
            } => {
                tracing::info!(
                    %correlation_id,
                    %strategy,
                    elapsed_s = elapsed.as_secs(),
                    "Still working"
                );
            }
            AcquireEvent::Blocked {
                correlation_id,
                strategy,
                signal,
            } => {
                tracing::warn!(
                    %correlation_id,
                    %strategy,
                    block_type = %signal.block_type,
                    confidence = signal.confidence,
                    remediation = ?signal.remediation,
                    "Blocked"
                );
            }
            AcquireEvent::AttemptFailed {
                correlation_id,
                strategy,
                error,
            } => {
                tracing::warn!(%correlation_id, %strategy, %error, "Attempt failed");
            }
            AcquireEvent::Backoff {
                correlation_id,
                delay,
            } => {
                tracing::debug!(%correlation_id, delay_ms = delay.as_millis() as u64, "Backing off");
            }
            AcquireEvent::Fetched {
                correlation_id,
                strategy,
                status,
                bytes,
            } => {
                tracing::info!(%correlation_id, %strategy, status, bytes, "Fetched");
            }
            AcquireEvent::Extracted {
                correlation_id,
                methods,
                fields,
            } => {
                tracing::info!(%correlation_id, methods, fields, "Extraction complete");
            }
            AcquireEvent::Completed {
                correlation_id,
                posting,
            } => {
                tracing::info!(
                    %correlation_id,
                    title = %posting.title,
                    company = %posting.company,
                    method = %posting.provenance.extraction_method,
                    "Acquisition completed"
                );
            }
            AcquireEvent::Failed {
                correlation_id,
                error,
            } => {
                tracing::warn!(
                    %correlation_id,
                    blocked = error.blocked,
                    message = %error.message,
                    "Acquisition failed"
                );
            }
        }
    }
}
