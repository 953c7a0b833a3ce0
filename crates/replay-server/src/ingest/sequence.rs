//! Replay code allocation: `RPY-YYMMDD-<fileName>-<n>`

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::db::{RecordScope, ReplayStore, StoreResult};

pub const CODE_PREFIX: &str = "RPY";

/// Prefix shared by every code of `file_name` created on `date` (UTC)
pub fn replay_code_prefix(date: NaiveDate, file_name: &str) -> String {
    format!("{CODE_PREFIX}-{}-{file_name}-", date.format("%y%m%d"))
}

/// Sequence number of `code` under `prefix`, if the remainder is all digits
pub fn parse_sequence(code: &str, prefix: &str) -> Option<u64> {
    let suffix = code.strip_prefix(prefix)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Successor of the highest existing code, or 1 when there is none
pub fn next_sequence(max_code: Option<&str>, prefix: &str) -> u64 {
    max_code
        .and_then(|code| parse_sequence(code, prefix))
        .map_or(1, |seq| seq.saturating_add(1))
}

pub fn format_code(prefix: &str, sequence: u64) -> String {
    format!("{prefix}{sequence}")
}

/// Derives the next free code from the store.
///
/// The lookup is not atomic with the insert that follows; callers retry on a
/// code conflict, passing the sequence that lost so the next candidate moves
/// past it even when the winning row is outside `scope`.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn ReplayStore>,
    scope: RecordScope,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn ReplayStore>, scope: RecordScope) -> Self {
        Self { store, scope }
    }

    pub async fn next_code(&self, file_name: &str) -> StoreResult<String> {
        let prefix = replay_code_prefix(Utc::now().date_naive(), file_name);
        let sequence = self.next_sequence_after(&prefix, None).await?;
        Ok(format_code(&prefix, sequence))
    }

    /// Next sequence for `prefix`, never lower than `rejected + 1`.
    ///
    /// The configured scope only applies to the first candidate. Once a code
    /// has been rejected, every row counts, so soft-deleted codes above the
    /// highest active one are skipped in a single step.
    pub async fn next_sequence_after(
        &self,
        prefix: &str,
        rejected: Option<u64>,
    ) -> StoreResult<u64> {
        let scope = match rejected {
            Some(_) => RecordScope::IncludeDeleted,
            None => self.scope,
        };
        let max_code = self.store.find_max_code_with_prefix(prefix, scope).await?;
        let derived = next_sequence(max_code.as_deref(), prefix);

        Ok(match rejected {
            Some(seq) => derived.max(seq.saturating_add(1)),
            None => derived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryReplayStore;
    use crate::models::NewReplay;
    use replay_common::types::GameType;

    #[test]
    fn test_prefix_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(replay_code_prefix(date, "f.rofl"), "RPY-240307-f.rofl-");
    }

    #[test]
    fn test_parse_sequence() {
        let prefix = "RPY-240307-f.rofl-";
        assert_eq!(parse_sequence("RPY-240307-f.rofl-12", prefix), Some(12));
        assert_eq!(parse_sequence("RPY-240307-f.rofl-", prefix), None);
        assert_eq!(parse_sequence("RPY-240307-f.rofl-1a", prefix), None);
        assert_eq!(parse_sequence("RPY-240307-f.rofl-x-3", prefix), None);
        assert_eq!(parse_sequence("RPY-240307-g.rofl-3", prefix), None);
    }

    #[test]
    fn test_next_sequence() {
        let prefix = "P-";
        assert_eq!(next_sequence(None, prefix), 1);
        assert_eq!(next_sequence(Some("P-9"), prefix), 10);
        assert_eq!(next_sequence(Some("P-junk"), prefix), 1);
        assert_eq!(format_code(prefix, 10), "P-10");
    }

    fn new_replay(code: String, hash: &str) -> NewReplay {
        NewReplay {
            code,
            file_name: "f.rofl".to_string(),
            source_url: "http://x/y".to_string(),
            payload: serde_json::json!([]),
            content_hash: hash.to_string(),
            game_type: GameType::default(),
            creator: "alice".to_string(),
            owner_id: "guildA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_allocator_increments_from_store() {
        let store = Arc::new(InMemoryReplayStore::new());
        let allocator = SequenceAllocator::new(store.clone(), RecordScope::IncludeDeleted);

        let first = allocator.next_code("f.rofl").await.unwrap();
        assert!(first.starts_with("RPY-") && first.ends_with("-f.rofl-1"));

        store.insert(new_replay(first, "h1")).await.unwrap();
        let second = allocator.next_code("f.rofl").await.unwrap();
        assert!(second.ends_with("-f.rofl-2"));
    }

    #[tokio::test]
    async fn test_allocator_moves_past_rejected_sequence() {
        let store = Arc::new(InMemoryReplayStore::new());
        let allocator = SequenceAllocator::new(store, RecordScope::ActiveOnly);

        assert_eq!(allocator.next_sequence_after("P-", None).await.unwrap(), 1);
        assert_eq!(allocator.next_sequence_after("P-", Some(1)).await.unwrap(), 2);
        assert_eq!(allocator.next_sequence_after("P-", Some(6)).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_rejected_sequence_counts_deleted_rows() {
        let store = Arc::new(InMemoryReplayStore::new());
        for seq in 1..=4 {
            let mut record = store
                .insert(new_replay(format!("P-{seq}"), &format!("h{seq}")))
                .await
                .unwrap();
            if seq > 1 {
                record.deleted = true;
                store.update(record).await.unwrap();
            }
        }
        let allocator = SequenceAllocator::new(store, RecordScope::ActiveOnly);

        assert_eq!(allocator.next_sequence_after("P-", None).await.unwrap(), 2);
        assert_eq!(allocator.next_sequence_after("P-", Some(2)).await.unwrap(), 5);
    }
}
