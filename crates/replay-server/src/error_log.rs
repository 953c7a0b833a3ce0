//! Centralized error log with caller-facing references

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use crate::db::{postgres::escape_like, StoreError};
use crate::error::ReplayError;
use crate::ingest::sequence::parse_sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn for_status(status: u16) -> Self {
        if status < 500 {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorLogEntry {
    pub kind: String,
    pub message: String,
    pub status: u16,
    pub severity: Severity,
    /// Request details (method, path, parameters)
    pub context: serde_json::Value,
}

impl ErrorLogEntry {
    pub fn from_error(err: &ReplayError, context: serde_json::Value) -> Self {
        let status = err.status_code().as_u16();
        Self {
            kind: err.error_code().to_string(),
            message: err.to_string(),
            status,
            severity: Severity::for_status(status),
            context,
        }
    }
}

#[async_trait]
pub trait ErrorLogger: Send + Sync {
    /// Persist `entry` and return the reference handed to the caller
    async fn record(&self, entry: &ErrorLogEntry) -> Result<String, StoreError>;
}

/// Record through `logger`, falling back to a tracing event if it fails
pub async fn report(logger: &dyn ErrorLogger, entry: &ErrorLogEntry) -> String {
    match logger.record(entry).await {
        Ok(reference) => reference,
        Err(e) => {
            tracing::warn!(error = %e, "Error log unavailable, falling back to tracing");
            TracingErrorLogger.emit(entry)
        },
    }
}

/// Emits entries as tracing events with a random reference
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLogger;

impl TracingErrorLogger {
    fn emit(&self, entry: &ErrorLogEntry) -> String {
        let reference = uuid::Uuid::new_v4().to_string();
        match entry.severity {
            Severity::Warning => tracing::warn!(
                reference = %reference,
                kind = %entry.kind,
                status = entry.status,
                context = %entry.context,
                "{}",
                entry.message
            ),
            Severity::Error => tracing::error!(
                reference = %reference,
                kind = %entry.kind,
                status = entry.status,
                context = %entry.context,
                "{}",
                entry.message
            ),
        }
        reference
    }
}

#[async_trait]
impl ErrorLogger for TracingErrorLogger {
    async fn record(&self, entry: &ErrorLogEntry) -> Result<String, StoreError> {
        Ok(self.emit(entry))
    }
}

/// `ERR-YYYYMMDD-` prefix for references issued on the current UTC day
pub fn error_reference_prefix() -> String {
    format!("ERR-{}-", Utc::now().format("%Y%m%d"))
}

pub fn format_error_reference(prefix: &str, sequence: u64) -> String {
    format!("{prefix}{sequence:03}")
}

/// Inserts into `error_logs`, numbering references per day
#[derive(Debug, Clone)]
pub struct PgErrorLogger {
    pool: PgPool,
    max_attempts: u32,
}

impl PgErrorLogger {
    pub fn new(pool: PgPool, max_attempts: u32) -> Self {
        Self {
            pool,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn next_sequence(&self, prefix: &str) -> Result<u64, StoreError> {
        let last = sqlx::query_scalar::<_, String>(
            r#"
            SELECT code
            FROM error_logs
            WHERE code LIKE $1 ESCAPE '\'
            ORDER BY length(code) DESC, code DESC
            LIMIT 1
            "#,
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_optional(&self.pool)
        .await?;

        Ok(last
            .as_deref()
            .and_then(|code| parse_sequence(code, prefix))
            .map_or(1, |seq| seq + 1))
    }
}

#[async_trait]
impl ErrorLogger for PgErrorLogger {
    #[tracing::instrument(skip(self, entry), fields(kind = %entry.kind))]
    async fn record(&self, entry: &ErrorLogEntry) -> Result<String, StoreError> {
        let prefix = error_reference_prefix();
        let mut rejected: Option<u64> = None;

        for _ in 0..self.max_attempts {
            let derived = self.next_sequence(&prefix).await?;
            let sequence = rejected.map_or(derived, |seq| derived.max(seq + 1));
            let reference = format_error_reference(&prefix, sequence);

            let result = sqlx::query(
                r#"
                INSERT INTO error_logs (code, kind, message, severity, status, context)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&reference)
            .bind(&entry.kind)
            .bind(&entry.message)
            .bind(entry.severity.as_str())
            .bind(i32::from(entry.status))
            .bind(&entry.context)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => return Ok(reference),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    rejected = Some(sequence);
                },
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Unavailable(format!(
            "no free error reference under {prefix}"
        )))
    }
}
