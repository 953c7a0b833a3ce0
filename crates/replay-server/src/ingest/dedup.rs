use std::sync::Arc;

use crate::db::{RecordScope, ReplayStore, StoreResult};

/// Read-only check for an existing replay with the same content and owner.
///
/// The store's unique index on active (content_hash, owner_id) is what
/// actually prevents duplicates under concurrency; this check only lets the
/// common case fail before a code is allocated.
#[derive(Clone)]
pub struct DuplicateGuard {
    store: Arc<dyn ReplayStore>,
    scope: RecordScope,
}

impl DuplicateGuard {
    pub fn new(store: Arc<dyn ReplayStore>, scope: RecordScope) -> Self {
        Self { store, scope }
    }

    pub async fn exists(&self, content_hash: &str, owner_id: &str) -> StoreResult<bool> {
        let existing = self
            .store
            .find_by_hash_and_owner(content_hash, owner_id, self.scope)
            .await?;
        Ok(existing.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryReplayStore;
    use crate::models::NewReplay;
    use replay_common::types::GameType;

    async fn seed_deleted(store: &InMemoryReplayStore) {
        let mut record = store
            .insert(NewReplay {
                code: "C-1".to_string(),
                file_name: "f.rofl".to_string(),
                source_url: "http://x/y".to_string(),
                payload: serde_json::json!([]),
                content_hash: "h1".to_string(),
                game_type: GameType::default(),
                creator: "alice".to_string(),
                owner_id: "guildA".to_string(),
            })
            .await
            .unwrap();
        record.deleted = true;
        store.update(record).await.unwrap();
    }

    #[tokio::test]
    async fn test_scope_decides_whether_deleted_rows_count() {
        let store = Arc::new(InMemoryReplayStore::new());
        seed_deleted(&store).await;

        let active = DuplicateGuard::new(store.clone(), RecordScope::ActiveOnly);
        let all = DuplicateGuard::new(store, RecordScope::IncludeDeleted);

        assert!(!active.exists("h1", "guildA").await.unwrap());
        assert!(all.exists("h1", "guildA").await.unwrap());
        assert!(!all.exists("h1", "guildB").await.unwrap());
    }
}
