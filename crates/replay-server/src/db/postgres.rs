//! PostgreSQL replay store

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RecordScope, ReplayStore, StoreError, StoreResult, UniqueConstraint};
use crate::models::{NewReplay, ReplayFilter, ReplayRecord};

/// Name of the unique constraint on `replays.code`
pub const CODE_CONSTRAINT: &str = "replays_code_key";

/// Name of the partial unique index on active (content_hash, owner_id)
pub const ACTIVE_HASH_OWNER_INDEX: &str = "replays_active_hash_owner_idx";

const REPLAY_COLUMNS: &str = "id, code, file_name, source_url, payload, content_hash, \
     game_type, creator, owner_id, created_at, updated_at, is_deleted";

#[derive(Debug, Clone)]
pub struct PgReplayStore {
    pool: PgPool,
}

impl PgReplayStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape `%`, `_` and `\` so `value` matches literally inside a LIKE pattern
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = match db_err.constraint() {
                Some(CODE_CONSTRAINT) => UniqueConstraint::Code,
                Some(ACTIVE_HASH_OWNER_INDEX) => UniqueConstraint::ContentHash,
                _ => UniqueConstraint::Other,
            };
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Database(err)
}

fn include_deleted(scope: RecordScope) -> bool {
    scope == RecordScope::IncludeDeleted
}

#[async_trait]
impl ReplayStore for PgReplayStore {
    #[tracing::instrument(skip(self, replay), fields(code = %replay.code))]
    async fn insert(&self, replay: NewReplay) -> StoreResult<ReplayRecord> {
        let sql = format!(
            r#"
            INSERT INTO replays (code, file_name, source_url, payload, content_hash,
                                 game_type, creator, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REPLAY_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ReplayRecord>(&sql)
            .bind(&replay.code)
            .bind(&replay.file_name)
            .bind(&replay.source_url)
            .bind(&replay.payload)
            .bind(&replay.content_hash)
            .bind(replay.game_type.to_string())
            .bind(&replay.creator)
            .bind(&replay.owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_hash_and_owner(
        &self,
        content_hash: &str,
        owner_id: &str,
        scope: RecordScope,
    ) -> StoreResult<Option<ReplayRecord>> {
        let sql = format!(
            r#"
            SELECT {REPLAY_COLUMNS}
            FROM replays
            WHERE content_hash = $1
              AND owner_id = $2
              AND ($3 OR NOT is_deleted)
            ORDER BY is_deleted ASC, id ASC
            LIMIT 1
            "#
        );

        let record = sqlx::query_as::<_, ReplayRecord>(&sql)
            .bind(content_hash)
            .bind(owner_id)
            .bind(include_deleted(scope))
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn find_max_code_with_prefix(
        &self,
        prefix: &str,
        scope: RecordScope,
    ) -> StoreResult<Option<String>> {
        // With an all-digit suffix and no zero padding, longer codes are larger.
        let pattern = format!("{}%", escape_like(prefix));
        let suffix_start = prefix.chars().count() as i32 + 1;

        let code = sqlx::query_scalar::<_, String>(
            r#"
            SELECT code
            FROM replays
            WHERE code LIKE $1 ESCAPE '\'
              AND substring(code FROM $2) ~ '^[0-9]+$'
              AND ($3 OR NOT is_deleted)
            ORDER BY length(code) DESC, code DESC
            LIMIT 1
            "#,
        )
        .bind(pattern)
        .bind(suffix_start)
        .bind(include_deleted(scope))
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn find_active_by_code(&self, code: &str) -> StoreResult<Option<ReplayRecord>> {
        let sql = format!(
            r#"
            SELECT {REPLAY_COLUMNS}
            FROM replays
            WHERE code = $1 AND NOT is_deleted
            "#
        );

        let record = sqlx::query_as::<_, ReplayRecord>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, record), fields(code = %record.code))]
    async fn update(&self, record: ReplayRecord) -> StoreResult<Option<ReplayRecord>> {
        let sql = format!(
            r#"
            UPDATE replays
            SET is_deleted = $2, updated_at = NOW()
            WHERE code = $1 AND NOT is_deleted
            RETURNING {REPLAY_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, ReplayRecord>(&sql)
            .bind(&record.code)
            .bind(record.deleted)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn list(&self, filter: &ReplayFilter) -> StoreResult<(Vec<ReplayRecord>, i64)> {
        let search_pattern = filter
            .search
            .as_ref()
            .map(|s| format!("%{}%", escape_like(s)));
        let game_type = filter.game_type.map(|g| g.to_string());

        const WHERE_CLAUSE: &str = r#"
            WHERE NOT is_deleted
              AND ($1::TEXT IS NULL OR owner_id = $1)
              AND ($2::TEXT IS NULL OR game_type = $2)
              AND ($3::TEXT IS NULL OR file_name ILIKE $3 ESCAPE '\' OR code ILIKE $3 ESCAPE '\')
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM replays {WHERE_CLAUSE}"))
            .bind(filter.owner_id.as_deref())
            .bind(game_type.as_deref())
            .bind(search_pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {REPLAY_COLUMNS} FROM replays {WHERE_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );

        let records = sqlx::query_as::<_, ReplayRecord>(&sql)
            .bind(filter.owner_id.as_deref())
            .bind(game_type.as_deref())
            .bind(search_pattern.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_common::types::GameType;
    use serde_json::json;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain.rofl"), "plain.rofl");
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    fn new_replay(code: &str, hash: &str, owner: &str) -> NewReplay {
        NewReplay {
            code: code.to_string(),
            file_name: "f.rofl".to_string(),
            source_url: "http://x/y".to_string(),
            payload: json!([{"a": 1}]),
            content_hash: hash.to_string(),
            game_type: GameType::default(),
            creator: "alice".to_string(),
            owner_id: owner.to_string(),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_insert_maps_unique_violations(pool: PgPool) {
        let store = PgReplayStore::new(pool);

        store
            .insert(new_replay("RPY-250101-f.rofl-1", "h1", "guildA"))
            .await
            .unwrap();

        let same_code = store
            .insert(new_replay("RPY-250101-f.rofl-1", "h2", "guildA"))
            .await;
        assert!(matches!(
            same_code,
            Err(StoreError::UniqueViolation(UniqueConstraint::Code))
        ));

        let same_hash = store
            .insert(new_replay("RPY-250101-f.rofl-2", "h1", "guildA"))
            .await;
        assert!(matches!(
            same_hash,
            Err(StoreError::UniqueViolation(UniqueConstraint::ContentHash))
        ));

        let other_owner = store
            .insert(new_replay("RPY-250101-f.rofl-2", "h1", "guildB"))
            .await;
        assert!(other_owner.is_ok());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_max_code_is_numeric(pool: PgPool) {
        let store = PgReplayStore::new(pool);

        for (i, seq) in [1, 9, 10, 2].iter().enumerate() {
            store
                .insert(new_replay(
                    &format!("RPY-250101-f.rofl-{seq}"),
                    &format!("h{i}"),
                    "guildA",
                ))
                .await
                .unwrap();
        }
        store
            .insert(new_replay("RPY-250101-f.rofl-x", "hx", "guildA"))
            .await
            .unwrap();

        let max = store
            .find_max_code_with_prefix("RPY-250101-f.rofl-", RecordScope::IncludeDeleted)
            .await
            .unwrap();
        assert_eq!(max.as_deref(), Some("RPY-250101-f.rofl-10"));

        let none = store
            .find_max_code_with_prefix("RPY-250101-g.rofl-", RecordScope::IncludeDeleted)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    /// Collects the names of spans opened while it is the default subscriber
    #[derive(Clone, Default)]
    struct SpanNames(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanNames {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(attrs.metadata().name().to_string());
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_lookups_open_spans(pool: PgPool) {
        use tracing_subscriber::layer::SubscriberExt;

        let names = SpanNames::default();
        let subscriber = tracing_subscriber::registry().with(names.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = PgReplayStore::new(pool);
        store
            .find_by_hash_and_owner("h1", "guildA", RecordScope::ActiveOnly)
            .await
            .unwrap();
        store
            .find_max_code_with_prefix("RPY-250101-f.rofl-", RecordScope::IncludeDeleted)
            .await
            .unwrap();

        let names = names.0.lock().unwrap();
        assert!(names.iter().any(|n| n == "find_by_hash_and_owner"));
        assert!(names.iter().any(|n| n == "find_max_code_with_prefix"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_update_only_touches_active_rows(pool: PgPool) {
        let store = PgReplayStore::new(pool);

        let mut record = store
            .insert(new_replay("RPY-250101-f.rofl-1", "h1", "guildA"))
            .await
            .unwrap();
        record.deleted = true;

        let first = store.update(record.clone()).await.unwrap();
        assert!(first.is_some_and(|r| r.deleted));

        let second = store.update(record).await.unwrap();
        assert!(second.is_none());

        let active = store.find_active_by_code("RPY-250101-f.rofl-1").await.unwrap();
        assert!(active.is_none());

        let scoped = store
            .find_by_hash_and_owner("h1", "guildA", RecordScope::ActiveOnly)
            .await
            .unwrap();
        assert!(scoped.is_none());

        let all = store
            .find_by_hash_and_owner("h1", "guildA", RecordScope::IncludeDeleted)
            .await
            .unwrap();
        assert!(all.is_some());
    }
}
