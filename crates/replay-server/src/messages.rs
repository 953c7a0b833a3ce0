//! Localized caller-facing messages

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::db::StoreError;

pub const DUPLICATE_HASH_KEY: &str = "replay_validate_duplicate_hash";
pub const DUPLICATE_HASH_FALLBACK: &str = "Replay file data duplicated.";

pub const NOT_FOUND_KEY: &str = "replay_not_found";
pub const NOT_FOUND_FALLBACK: &str = "Replay not found.";

#[async_trait]
pub trait MessageCatalog: Send + Sync {
    async fn get_message(&self, locale: &str, key: &str) -> Result<Option<String>, StoreError>;
}

/// Catalog message for `key`, or `fallback` when it is missing or the catalog fails
pub async fn resolve_message(
    catalog: &dyn MessageCatalog,
    locale: &str,
    key: &str,
    fallback: &str,
) -> String {
    match catalog.get_message(locale, key).await {
        Ok(Some(message)) => message,
        Ok(None) => fallback.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, locale, key, "Message lookup failed, using fallback");
            fallback.to_string()
        },
    }
}

/// Reads active rows of the `messages` table
#[derive(Debug, Clone)]
pub struct PgMessageCatalog {
    pool: PgPool,
}

impl PgMessageCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageCatalog for PgMessageCatalog {
    async fn get_message(&self, locale: &str, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value
            FROM messages
            WHERE language_code = $1 AND key = $2 AND NOT is_deleted
            LIMIT 1
            "#,
        )
        .bind(locale)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }
}

/// Fixed (locale, key) table
#[derive(Debug, Clone, Default)]
pub struct StaticMessageCatalog {
    messages: HashMap<(String, String), String>,
}

impl StaticMessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(
        mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.messages
            .insert((locale.into(), key.into()), value.into());
        self
    }
}

#[async_trait]
impl MessageCatalog for StaticMessageCatalog {
    async fn get_message(&self, locale: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .messages
            .get(&(locale.to_string(), key.to_string()))
            .cloned())
    }
}
