//! Replay Vault Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Replay Vault workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Common error and result types
//! - **Checksums**: Content hashing for replay deduplication
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Types**: Shared domain types such as [`types::GameType`]
//!
//! # Example
//!
//! ```
//! use replay_common::checksum::content_hash;
//!
//! let hash = content_hash(r#"[{"a":1}]"#);
//! assert_eq!(hash.len(), 64);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ReplayCommonError, Result};
