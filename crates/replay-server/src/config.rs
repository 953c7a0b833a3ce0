//! Configuration management

use replay_common::types::GameType;
use serde::{Deserialize, Serialize};

use crate::db::RecordScope;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/replay_vault";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Ingestion Configuration Constants
// ============================================================================

/// Default cap on a downloaded replay artifact (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Default timeout for a whole artifact download in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Default User-Agent sent when downloading artifacts.
pub const DEFAULT_USER_AGENT: &str = "Replay-Vault-Ingester/1.0";

/// Default number of insert attempts when a replay code is already taken.
pub const DEFAULT_CODE_MAX_ATTEMPTS: u32 = 5;

/// Default number of insert attempts when an error reference is already taken.
pub const DEFAULT_ERROR_REFERENCE_MAX_ATTEMPTS: u32 = 5;

/// Default locale for caller-facing messages.
pub const DEFAULT_LOCALE: &str = "ko";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub ingest: IngestConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Which persistence backend holds replay records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid store backend: {}", s)),
        }
    }
}

/// Whether business errors of each kind are sent to the error log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogPolicy {
    pub duplicate_hash: bool,
    pub not_found: bool,
}

impl Default for ErrorLogPolicy {
    fn default() -> Self {
        Self {
            duplicate_hash: true,
            not_found: true,
        }
    }
}

/// Replay ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Downloads larger than this fail with `OversizedPayload`
    pub max_payload_bytes: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Game type stored when the request omits one
    pub default_game_type: GameType,
    /// Rows considered when checking for a duplicate (hash, owner)
    pub duplicate_scope: RecordScope,
    /// Rows considered when looking up the highest code for a prefix
    pub sequence_scope: RecordScope,
    pub max_code_attempts: u32,
    /// Insert attempts for an `ERR-YYYYMMDD-NNN` reference in the error log
    pub error_reference_max_attempts: u32,
    pub default_locale: String,
    pub error_log_policy: ErrorLogPolicy,
    pub store: StoreBackend,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_game_type: GameType::default(),
            duplicate_scope: RecordScope::ActiveOnly,
            sequence_scope: RecordScope::IncludeDeleted,
            max_code_attempts: DEFAULT_CODE_MAX_ATTEMPTS,
            error_reference_max_attempts: DEFAULT_ERROR_REFERENCE_MAX_ATTEMPTS,
            default_locale: DEFAULT_LOCALE.to_string(),
            error_log_policy: ErrorLogPolicy::default(),
            store: StoreBackend::default(),
        }
    }
}

impl IngestConfig {
    /// Read ingestion settings from `REPLAY_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            max_payload_bytes: env_parse("REPLAY_MAX_PAYLOAD_BYTES")
                .unwrap_or(defaults.max_payload_bytes),
            fetch_timeout_secs: env_parse("REPLAY_FETCH_TIMEOUT_SECS")
                .unwrap_or(defaults.fetch_timeout_secs),
            user_agent: std::env::var("REPLAY_USER_AGENT").unwrap_or(defaults.user_agent),
            default_game_type: match std::env::var("REPLAY_DEFAULT_GAME_TYPE") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.default_game_type,
            },
            duplicate_scope: match std::env::var("REPLAY_DUPLICATE_SCOPE") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.duplicate_scope,
            },
            sequence_scope: match std::env::var("REPLAY_SEQUENCE_SCOPE") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.sequence_scope,
            },
            max_code_attempts: env_parse("REPLAY_CODE_MAX_ATTEMPTS")
                .unwrap_or(defaults.max_code_attempts),
            error_reference_max_attempts: env_parse("REPLAY_ERROR_REF_MAX_ATTEMPTS")
                .unwrap_or(defaults.error_reference_max_attempts),
            default_locale: std::env::var("REPLAY_DEFAULT_LOCALE")
                .unwrap_or(defaults.default_locale),
            error_log_policy: ErrorLogPolicy {
                duplicate_hash: env_parse("REPLAY_LOG_DUPLICATE_HASH")
                    .unwrap_or(defaults.error_log_policy.duplicate_hash),
                not_found: env_parse("REPLAY_LOG_NOT_FOUND")
                    .unwrap_or(defaults.error_log_policy.not_found),
            },
            store: match std::env::var("REPLAY_STORE") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.store,
            },
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_payload_bytes == 0 {
            anyhow::bail!("REPLAY_MAX_PAYLOAD_BYTES must be greater than 0");
        }

        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("REPLAY_FETCH_TIMEOUT_SECS must be greater than 0");
        }

        if self.max_code_attempts == 0 {
            anyhow::bail!("REPLAY_CODE_MAX_ATTEMPTS must be greater than 0");
        }

        if self.error_reference_max_attempts == 0 {
            anyhow::bail!("REPLAY_ERROR_REF_MAX_ATTEMPTS must be greater than 0");
        }

        if self.default_locale.trim().is_empty() {
            anyhow::bail!("REPLAY_DEFAULT_LOCALE cannot be empty");
        }

        if self.sequence_scope == RecordScope::ActiveOnly {
            tracing::warn!(
                "REPLAY_SEQUENCE_SCOPE=active: codes of soft-deleted replays are skipped \
                 during allocation and resolved by insert retries"
            );
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("REPLAY_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_parse("REPLAY_PORT").unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse("REPLAY_SHUTDOWN_TIMEOUT")
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_parse("DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: env_parse("DATABASE_IDLE_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS").unwrap_or(true),
            },
            ingest: IngestConfig::from_env()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.ingest.store == StoreBackend::Postgres && self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        self.ingest.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            ingest: IngestConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const INGEST_VARS: &[&str] = &[
        "REPLAY_MAX_PAYLOAD_BYTES",
        "REPLAY_DUPLICATE_SCOPE",
        "REPLAY_SEQUENCE_SCOPE",
        "REPLAY_CODE_MAX_ATTEMPTS",
        "REPLAY_ERROR_REF_MAX_ATTEMPTS",
        "REPLAY_DEFAULT_GAME_TYPE",
        "REPLAY_LOG_NOT_FOUND",
        "REPLAY_STORE",
    ];

    fn clear_ingest_env() {
        for var in INGEST_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ingest.duplicate_scope, RecordScope::ActiveOnly);
        assert_eq!(config.ingest.sequence_scope, RecordScope::IncludeDeleted);
        assert_eq!(config.ingest.default_game_type.as_char(), '1');
    }

    #[test]
    fn test_min_connections_above_max_rejected() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_payload_cap_rejected() {
        let mut config = IngestConfig::default();
        config.max_payload_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_code_attempts_rejected() {
        let mut config = IngestConfig::default();
        config.max_code_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_error_reference_attempts_rejected() {
        let mut config = IngestConfig::default();
        config.error_reference_max_attempts = 0;
        assert!(config.validate().is_err());
        assert_eq!(
            IngestConfig::default().error_reference_max_attempts,
            DEFAULT_ERROR_REFERENCE_MAX_ATTEMPTS
        );
    }

    #[test]
    #[serial]
    fn test_ingest_config_from_env() {
        clear_ingest_env();
        std::env::set_var("REPLAY_MAX_PAYLOAD_BYTES", "1024");
        std::env::set_var("REPLAY_DUPLICATE_SCOPE", "all");
        std::env::set_var("REPLAY_SEQUENCE_SCOPE", "active");
        std::env::set_var("REPLAY_DEFAULT_GAME_TYPE", "2");
        std::env::set_var("REPLAY_CODE_MAX_ATTEMPTS", "3");
        std::env::set_var("REPLAY_ERROR_REF_MAX_ATTEMPTS", "9");
        std::env::set_var("REPLAY_LOG_NOT_FOUND", "false");
        std::env::set_var("REPLAY_STORE", "memory");

        let config = IngestConfig::from_env().unwrap();
        clear_ingest_env();

        assert_eq!(config.max_payload_bytes, 1024);
        assert_eq!(config.duplicate_scope, RecordScope::IncludeDeleted);
        assert_eq!(config.sequence_scope, RecordScope::ActiveOnly);
        assert_eq!(config.default_game_type.as_char(), '2');
        assert_eq!(config.max_code_attempts, 3);
        assert_eq!(config.error_reference_max_attempts, 9);
        assert!(!config.error_log_policy.not_found);
        assert!(config.error_log_policy.duplicate_hash);
        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_ingest_config_rejects_bad_scope() {
        clear_ingest_env();
        std::env::set_var("REPLAY_DUPLICATE_SCOPE", "sometimes");
        let result = IngestConfig::from_env();
        clear_ingest_env();
        assert!(result.is_err());
    }
}
