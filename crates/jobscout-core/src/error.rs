use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::{BlockSignal, BlockType};

/// Application-wide error types for jobscout.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// HTTP request could not be completed (bad request, unreadable body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The response was classified as an anti-bot block.
    #[error("Blocked: {} ({:.2} confidence)", .0.block_type, .0.confidence)]
    Blocked(BlockSignal),

    /// The requested executor is disabled or has nothing to work with.
    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A single extraction method failed to parse the page.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Persisting a posting failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl AppError {
    /// Returns true if this error is transient and worth retrying with
    /// another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::Blocked(_)
            | AppError::ExecutorUnavailable(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}

/// Terminal failure of an acquisition, as reported to callers.
///
/// Serializes to `{blocked, type, confidence, httpStatus, message}`.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct AcquisitionError {
    pub blocked: bool,
    #[serde(rename = "type")]
    pub block_type: Option<BlockType>,
    pub confidence: Option<f64>,
    pub http_status: Option<u16>,
    pub message: String,
}

impl AcquisitionError {
    /// Failure carrying the last classified block.
    pub fn from_signal(signal: &BlockSignal, message: impl Into<String>) -> Self {
        Self {
            blocked: true,
            block_type: Some(signal.block_type),
            confidence: Some(signal.confidence),
            http_status: signal.http_status,
            message: message.into(),
        }
    }

    /// Failure without any block verdict (network errors, bad input).
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::Blocked(signal) => Self::from_signal(signal, err.to_string()),
            other => Self {
                blocked: false,
                block_type: None,
                confidence: None,
                http_status: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<AppError> for AcquisitionError {
    fn from(err: AppError) -> Self {
        Self::from_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Remediation;

    fn signal() -> BlockSignal {
        BlockSignal {
            block_type: BlockType::HttpStatus,
            confidence: 0.9,
            markers: vec!["http 403".into()],
            remediation: Remediation::RotateIdentity,
            http_status: Some(403),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::NetworkError("reset".into()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(AppError::Blocked(signal()).is_retryable());
        assert!(AppError::HttpError("connect refused".into()).is_retryable());
        assert!(!AppError::InvalidUrl("nope".into()).is_retryable());
        assert!(!AppError::ExtractionError("bad json".into()).is_retryable());
    }

    #[test]
    fn test_acquisition_error_from_block() {
        let err = AcquisitionError::from(AppError::Blocked(signal()));
        assert!(err.blocked);
        assert_eq!(err.block_type, Some(BlockType::HttpStatus));
        assert_eq!(err.http_status, Some(403));
    }

    #[test]
    fn test_acquisition_error_serializes_camel_case() {
        let err = AcquisitionError::from_signal(&signal(), "blocked after 3 attempts");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["blocked"], true);
        assert_eq!(json["type"], "http_status");
        assert_eq!(json["httpStatus"], 403);
        assert_eq!(json["confidence"], 0.9);
    }

    #[test]
    fn test_network_failure_is_not_blocked() {
        let err = AcquisitionError::from_error(&AppError::NetworkError("refused".into()));
        assert!(!err.blocked);
        assert!(err.block_type.is_none());
        assert!(err.message.contains("refused"));
    }
}
