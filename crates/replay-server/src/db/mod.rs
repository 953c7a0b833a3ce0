//! Replay persistence: connection pool, store trait and backends

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryReplayStore;
pub use postgres::PgReplayStore;
pub use store::ReplayStore;

/// Unique constraint that rejected an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// `replays.code` is already taken
    Code,
    /// An active row already has this (content_hash, owner_id)
    ContentHash,
    Other,
}

/// Persistence failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// Insert rejected by a uniqueness constraint
    #[error("Unique constraint violated: {0:?}")]
    UniqueViolation(UniqueConstraint),

    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend cannot serve requests
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which rows a lookup considers with respect to soft deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordScope {
    /// Only rows with `is_deleted = false`
    ActiveOnly,
    /// Every row, soft-deleted or not
    IncludeDeleted,
}

impl RecordScope {
    pub fn includes(self, deleted: bool) -> bool {
        match self {
            RecordScope::ActiveOnly => !deleted,
            RecordScope::IncludeDeleted => true,
        }
    }
}

impl std::str::FromStr for RecordScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" | "active_only" => Ok(RecordScope::ActiveOnly),
            "all" | "include_deleted" => Ok(RecordScope::IncludeDeleted),
            _ => Err(anyhow::anyhow!("Invalid record scope: {} (expected active or all)", s)),
        }
    }
}

pub async fn create_pool(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> StoreResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(StoreError::from)
}
