//! In-process replay store with the same constraint semantics as PostgreSQL

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

use super::{RecordScope, ReplayStore, StoreError, StoreResult, UniqueConstraint};
use crate::ingest::sequence::parse_sequence;
use crate::models::{NewReplay, ReplayFilter, ReplayRecord};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    rows: Vec<ReplayRecord>,
}

/// Vec-backed store. Every operation yields to the runtime first so that
/// concurrent callers interleave between their reads and inserts.
#[derive(Debug, Default)]
pub struct InMemoryReplayStore {
    inner: Mutex<Inner>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    /// Every row including soft-deleted ones, in insertion order
    pub fn snapshot(&self) -> StoreResult<Vec<ReplayRecord>> {
        Ok(self.lock()?.rows.clone())
    }
}

#[async_trait]
impl ReplayStore for InMemoryReplayStore {
    async fn insert(&self, replay: NewReplay) -> StoreResult<ReplayRecord> {
        tokio::task::yield_now().await;
        let mut inner = self.lock()?;

        if inner.rows.iter().any(|r| r.code == replay.code) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::Code));
        }
        if inner.rows.iter().any(|r| {
            !r.deleted && r.content_hash == replay.content_hash && r.owner_id == replay.owner_id
        }) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::ContentHash));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let record = ReplayRecord {
            id: inner.next_id,
            code: replay.code,
            file_name: replay.file_name,
            source_url: replay.source_url,
            payload: replay.payload,
            content_hash: replay.content_hash,
            game_type: replay.game_type,
            creator: replay.creator,
            owner_id: replay.owner_id,
            created_at: now,
            updated_at: now,
            deleted: false,
        };
        inner.rows.push(record.clone());

        Ok(record)
    }

    async fn find_by_hash_and_owner(
        &self,
        content_hash: &str,
        owner_id: &str,
        scope: RecordScope,
    ) -> StoreResult<Option<ReplayRecord>> {
        tokio::task::yield_now().await;
        let inner = self.lock()?;

        Ok(inner
            .rows
            .iter()
            .find(|r| {
                scope.includes(r.deleted) && r.content_hash == content_hash && r.owner_id == owner_id
            })
            .cloned())
    }

    async fn find_max_code_with_prefix(
        &self,
        prefix: &str,
        scope: RecordScope,
    ) -> StoreResult<Option<String>> {
        tokio::task::yield_now().await;
        let inner = self.lock()?;

        Ok(inner
            .rows
            .iter()
            .filter(|r| scope.includes(r.deleted))
            .filter_map(|r| parse_sequence(&r.code, prefix).map(|seq| (seq, &r.code)))
            .max_by_key(|(seq, _)| *seq)
            .map(|(_, code)| code.clone()))
    }

    async fn find_active_by_code(&self, code: &str) -> StoreResult<Option<ReplayRecord>> {
        tokio::task::yield_now().await;
        let inner = self.lock()?;

        Ok(inner.rows.iter().find(|r| !r.deleted && r.code == code).cloned())
    }

    async fn update(&self, record: ReplayRecord) -> StoreResult<Option<ReplayRecord>> {
        tokio::task::yield_now().await;
        let mut inner = self.lock()?;

        let Some(row) = inner
            .rows
            .iter_mut()
            .find(|r| !r.deleted && r.code == record.code)
        else {
            return Ok(None);
        };

        row.deleted = record.deleted;
        row.updated_at = Utc::now();

        Ok(Some(row.clone()))
    }

    async fn list(&self, filter: &ReplayFilter) -> StoreResult<(Vec<ReplayRecord>, i64)> {
        tokio::task::yield_now().await;
        let inner = self.lock()?;

        let mut matching: Vec<&ReplayRecord> =
            inner.rows.iter().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_common::types::GameType;
    use serde_json::json;

    fn new_replay(code: &str, hash: &str, owner: &str) -> NewReplay {
        NewReplay {
            code: code.to_string(),
            file_name: "f.rofl".to_string(),
            source_url: "http://x/y".to_string(),
            payload: json!({"a": 1}),
            content_hash: hash.to_string(),
            game_type: GameType::default(),
            creator: "alice".to_string(),
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_enforces_constraints() {
        let store = InMemoryReplayStore::new();

        let first = store.insert(new_replay("C-1", "h1", "o1")).await.unwrap();
        assert_eq!(first.id, 1);
        assert!(!first.deleted);

        assert!(matches!(
            store.insert(new_replay("C-1", "h2", "o1")).await,
            Err(StoreError::UniqueViolation(UniqueConstraint::Code))
        ));
        assert!(matches!(
            store.insert(new_replay("C-2", "h1", "o1")).await,
            Err(StoreError::UniqueViolation(UniqueConstraint::ContentHash))
        ));
        assert!(store.insert(new_replay("C-2", "h1", "o2")).await.is_ok());
    }

    #[tokio::test]
    async fn test_soft_deleted_hash_can_be_reinserted() {
        let store = InMemoryReplayStore::new();

        let mut record = store.insert(new_replay("C-1", "h1", "o1")).await.unwrap();
        record.deleted = true;
        assert!(store.update(record).await.unwrap().is_some());

        assert!(store.insert(new_replay("C-2", "h1", "o1")).await.is_ok());
        // the code constraint still covers deleted rows
        assert!(matches!(
            store.insert(new_replay("C-1", "h3", "o1")).await,
            Err(StoreError::UniqueViolation(UniqueConstraint::Code))
        ));
    }

    #[tokio::test]
    async fn test_update_is_conditional_on_active_row() {
        let store = InMemoryReplayStore::new();

        let mut record = store.insert(new_replay("C-1", "h1", "o1")).await.unwrap();
        record.deleted = true;

        let updated = store.update(record.clone()).await.unwrap().unwrap();
        assert!(updated.deleted);
        assert!(updated.updated_at >= updated.created_at);

        assert!(store.update(record).await.unwrap().is_none());
        assert!(store.find_active_by_code("C-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_max_code_respects_scope_and_numeric_order() {
        let store = InMemoryReplayStore::new();

        for (seq, hash) in [(1, "h1"), (9, "h9"), (10, "h10")] {
            store
                .insert(new_replay(&format!("P-{seq}"), hash, "o1"))
                .await
                .unwrap();
        }
        store.insert(new_replay("P-abc", "hx", "o1")).await.unwrap();

        let mut top = store.find_active_by_code("P-10").await.unwrap().unwrap();
        top.deleted = true;
        store.update(top).await.unwrap();

        let all = store
            .find_max_code_with_prefix("P-", RecordScope::IncludeDeleted)
            .await
            .unwrap();
        assert_eq!(all.as_deref(), Some("P-10"));

        let active = store
            .find_max_code_with_prefix("P-", RecordScope::ActiveOnly)
            .await
            .unwrap();
        assert_eq!(active.as_deref(), Some("P-9"));

        assert!(store
            .find_max_code_with_prefix("Q-", RecordScope::IncludeDeleted)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let store = InMemoryReplayStore::new();
        store.insert(new_replay("RPY-1", "h1", "o1")).await.unwrap();
        store.insert(new_replay("RPY-2", "h2", "o1")).await.unwrap();
        store.insert(new_replay("RPY-3", "h3", "o2")).await.unwrap();

        let filter = ReplayFilter {
            owner_id: Some("o1".to_string()),
            limit: 1,
            offset: 0,
            ..Default::default()
        };
        let (items, total) = store.list(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, "RPY-2");

        let filter = ReplayFilter {
            search: Some("rpy-3".to_string()),
            limit: 10,
            ..Default::default()
        };
        let (items, total) = store.list(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].owner_id, "o2");
    }
}
