//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, ReplayCommonError>;

/// Main error type for shared utilities
#[derive(Error, Debug)]
pub enum ReplayCommonError {
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid game type '{0}': must be exactly one character")]
    InvalidGameType(String),
}
