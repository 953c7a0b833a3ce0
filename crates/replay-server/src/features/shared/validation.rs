//! Shared request validation
//!
//! ```rust,ignore
//! use replay_server::features::shared::validation::{validate_length, validate_url};
//!
//! validate_length(&command.file_name, "fileName", 128)?;
//! validate_url(&command.file_url, "fileUrl", 255)?;
//! ```

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be at most {max_length} characters")]
    TooLong {
        field: &'static str,
        max_length: usize,
    },

    #[error("{field} must be exactly {length} character(s)")]
    ExactLength { field: &'static str, length: usize },

    #[error("{field} is invalid: must start with http:// or https://")]
    InvalidUrl { field: &'static str },
}

/// Non-blank and at most `max_length` characters
pub fn validate_length(
    value: &str,
    field: &'static str,
    max_length: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() > max_length {
        return Err(ValidationError::TooLong { field, max_length });
    }
    Ok(())
}

pub fn validate_exact_length(
    value: &str,
    field: &'static str,
    length: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() != length {
        return Err(ValidationError::ExactLength { field, length });
    }
    Ok(())
}

pub fn validate_url(
    url: &str,
    field: &'static str,
    max_length: usize,
) -> Result<(), ValidationError> {
    validate_length(url, field, max_length)?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::InvalidUrl { field });
    }
    Ok(())
}
