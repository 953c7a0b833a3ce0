//! Replay Vault Server Library
//!
//! Ingests recorded match replays: downloads an artifact, recovers the stats
//! document embedded in it, and stores one record per distinct content and
//! owner under a readable code `RPY-YYMMDD-<fileName>-<n>`.
//!
//! # Overview
//!
//! - **Ingestion** ([`ingest`]): fetcher, payload extractor, duplicate guard,
//!   sequence allocator and the [`ingest::ReplayIngestor`] that composes them
//! - **Persistence** ([`db`]): the [`db::ReplayStore`] contract with
//!   PostgreSQL and in-memory backends
//! - **HTTP API** ([`api`], [`features`]): Axum routes under `/api/v1/replays`
//! - **Collaborators**: localized messages ([`messages`]) and the error log
//!   ([`error_log`])
//!
//! # Concurrency
//!
//! The ingestor keeps no shared mutable state. Duplicate content is rejected
//! by a unique index on active `(content_hash, owner_id)` rows, and code
//! collisions between concurrent saves are resolved by re-allocating and
//! retrying the insert.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use replay_server::config::IngestConfig;
//! use replay_server::db::InMemoryReplayStore;
//! use replay_server::ingest::{HttpFetcher, ReplayIngestor};
//! use replay_server::messages::StaticMessageCatalog;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = IngestConfig::default();
//! let ingestor = ReplayIngestor::new(
//!     Arc::new(InMemoryReplayStore::new()),
//!     Arc::new(HttpFetcher::new(&config)?),
//!     Arc::new(StaticMessageCatalog::new()),
//!     &config,
//! );
//! ingestor.soft_delete("RPY-250101-f.rofl-1", "en").await.ok();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod error_log;
pub mod features;
pub mod ingest;
pub mod messages;
pub mod middleware;
pub mod models;

pub use error::{ErrorCategory, ReplayError, ReplayResult};
