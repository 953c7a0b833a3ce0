//! Replay ingestion error taxonomy

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::ingest::extractor::ExtractError;
use crate::ingest::fetcher::FetchError;

pub type ReplayResult<T> = std::result::Result<T, ReplayError>;

/// Whether an error's message may be shown to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Caller-safe message
    Business,
    /// Internal fault; the caller only sees a log reference
    System,
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Artifact download failed: {0}")]
    Transport(String),

    #[error("Artifact at {url} has an empty body")]
    EmptyPayload { url: String },

    #[error("Artifact exceeds the {limit} byte limit")]
    OversizedPayload { limit: u64 },

    #[error("Artifact download cancelled")]
    Cancelled,

    #[error("Replay metadata could not be parsed: {0}")]
    Parse(#[from] ExtractError),

    #[error("Replay store failure: {0}")]
    Store(#[from] StoreError),

    #[error("No free replay code under {prefix} after {attempts} attempts")]
    SequenceConflict { prefix: String, attempts: u32 },

    #[error("{message}")]
    DuplicateHash { message: String, log: bool },

    #[error("{message}")]
    NotFound { message: String, log: bool },
}

impl ReplayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReplayError::DuplicateHash { .. } | ReplayError::NotFound { .. } => {
                ErrorCategory::Business
            },
            _ => ErrorCategory::System,
        }
    }

    /// System errors are always logged; business errors follow their policy flag
    pub fn should_log(&self) -> bool {
        match self {
            ReplayError::DuplicateHash { log, .. } | ReplayError::NotFound { log, .. } => *log,
            _ => true,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ReplayError::DuplicateHash { .. } => StatusCode::CONFLICT,
            ReplayError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable name, used in responses and the error log
    pub fn error_code(&self) -> &'static str {
        match self {
            ReplayError::Transport(_) => "TRANSPORT_ERROR",
            ReplayError::EmptyPayload { .. } => "EMPTY_PAYLOAD",
            ReplayError::OversizedPayload { .. } => "OVERSIZED_PAYLOAD",
            ReplayError::Cancelled => "CANCELLED",
            ReplayError::Parse(_) => "PARSE_ERROR",
            ReplayError::Store(_) => "STORE_ERROR",
            ReplayError::SequenceConflict { .. } => "SEQUENCE_CONFLICT",
            ReplayError::DuplicateHash { .. } => "DUPLICATE_HASH",
            ReplayError::NotFound { .. } => "NOT_FOUND",
        }
    }

    /// A later attempt may succeed without any change to the request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReplayError::Transport(_) | ReplayError::SequenceConflict { .. } | ReplayError::Cancelled
        )
    }
}

impl From<FetchError> for ReplayError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => ReplayError::Transport(e.to_string()),
            FetchError::EmptyPayload { url } => ReplayError::EmptyPayload { url },
            FetchError::OversizedPayload { limit } => ReplayError::OversizedPayload { limit },
            FetchError::Cancelled => ReplayError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors() {
        let dup = ReplayError::DuplicateHash {
            message: "dup".to_string(),
            log: false,
        };
        assert_eq!(dup.category(), ErrorCategory::Business);
        assert_eq!(dup.status_code(), StatusCode::CONFLICT);
        assert!(!dup.should_log());
        assert_eq!(dup.to_string(), "dup");

        let missing = ReplayError::NotFound {
            message: "gone".to_string(),
            log: true,
        };
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert!(missing.should_log());
    }

    #[test]
    fn test_system_errors_always_log() {
        let errors = [
            ReplayError::Transport("refused".to_string()),
            ReplayError::EmptyPayload {
                url: "http://x".to_string(),
            },
            ReplayError::OversizedPayload { limit: 1 },
            ReplayError::Cancelled,
            ReplayError::Parse(ExtractError::MissingStats),
            ReplayError::Store(StoreError::Unavailable("down".to_string())),
            ReplayError::SequenceConflict {
                prefix: "P-".to_string(),
                attempts: 5,
            },
        ];

        for err in errors {
            assert_eq!(err.category(), ErrorCategory::System, "{err}");
            assert!(err.should_log());
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_fetch_error_conversion() {
        let err: ReplayError = FetchError::OversizedPayload { limit: 10 }.into();
        assert!(matches!(err, ReplayError::OversizedPayload { limit: 10 }));
        assert_eq!(err.error_code(), "OVERSIZED_PAYLOAD");

        let err: ReplayError = FetchError::Cancelled.into();
        assert!(err.is_retryable());
    }
}
