//! Save and soft-delete of replays

use chrono::Utc;
use replay_common::checksum::content_hash;
use replay_common::types::GameType;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::dedup::DuplicateGuard;
use super::extractor::extract;
use super::fetcher::ArtifactSource;
use super::sequence::{format_code, replay_code_prefix, SequenceAllocator};
use crate::config::{ErrorLogPolicy, IngestConfig};
use crate::db::{ReplayStore, StoreError, UniqueConstraint};
use crate::error::{ReplayError, ReplayResult};
use crate::messages::{
    resolve_message, MessageCatalog, DUPLICATE_HASH_FALLBACK, DUPLICATE_HASH_KEY,
    NOT_FOUND_FALLBACK, NOT_FOUND_KEY,
};
use crate::models::{NewReplay, ReplayFilter, ReplayRecord, ReplayUpload};

/// Composes fetch, extraction, hashing, deduplication and code allocation.
///
/// Holds no mutable state; every invariant on stored replays is enforced by
/// the store's unique constraints, so any number of ingestors may run against
/// the same store.
#[derive(Clone)]
pub struct ReplayIngestor {
    store: Arc<dyn ReplayStore>,
    source: Arc<dyn ArtifactSource>,
    messages: Arc<dyn MessageCatalog>,
    guard: DuplicateGuard,
    allocator: SequenceAllocator,
    default_game_type: GameType,
    max_code_attempts: u32,
    log_policy: ErrorLogPolicy,
}

impl ReplayIngestor {
    pub fn new(
        store: Arc<dyn ReplayStore>,
        source: Arc<dyn ArtifactSource>,
        messages: Arc<dyn MessageCatalog>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            guard: DuplicateGuard::new(store.clone(), config.duplicate_scope),
            allocator: SequenceAllocator::new(store.clone(), config.sequence_scope),
            store,
            source,
            messages,
            default_game_type: config.default_game_type,
            max_code_attempts: config.max_code_attempts.max(1),
            log_policy: config.error_log_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReplayStore> {
        &self.store
    }

    #[tracing::instrument(
        skip(self, upload, cancel),
        fields(
            file_name = %upload.file_name,
            owner_id = %upload.owner_id,
            content_hash,
            code,
        )
    )]
    pub async fn save(
        &self,
        upload: ReplayUpload,
        locale: &str,
        cancel: &CancellationToken,
    ) -> ReplayResult<ReplayRecord> {
        let bytes = self.source.fetch(&upload.file_url, cancel).await?;
        let payload = extract(&bytes)?;
        let hash = content_hash(&payload.canonical);
        tracing::Span::current().record("content_hash", hash.as_str());

        if self.guard.exists(&hash, &upload.owner_id).await? {
            return Err(self.duplicate_hash(locale).await);
        }

        if cancel.is_cancelled() {
            return Err(ReplayError::Cancelled);
        }

        let prefix = replay_code_prefix(Utc::now().date_naive(), &upload.file_name);
        let game_type = upload.game_type.unwrap_or(self.default_game_type);
        let mut rejected = None;

        for attempt in 1..=self.max_code_attempts {
            let sequence = self.allocator.next_sequence_after(&prefix, rejected).await?;
            let code = format_code(&prefix, sequence);

            let replay = NewReplay {
                code: code.clone(),
                file_name: upload.file_name.clone(),
                source_url: upload.file_url.clone(),
                payload: payload.value.clone(),
                content_hash: hash.clone(),
                game_type,
                creator: upload.creator.clone(),
                owner_id: upload.owner_id.clone(),
            };

            match self.store.insert(replay).await {
                Ok(record) => {
                    tracing::Span::current().record("code", record.code.as_str());
                    info!(code = %record.code, attempt, "Replay saved");
                    return Ok(record);
                },
                Err(StoreError::UniqueViolation(UniqueConstraint::Code)) => {
                    debug!(code = %code, attempt, "Replay code taken, allocating again");
                    rejected = Some(sequence);
                },
                Err(StoreError::UniqueViolation(UniqueConstraint::ContentHash)) => {
                    return Err(self.duplicate_hash(locale).await);
                },
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReplayError::SequenceConflict {
            prefix,
            attempts: self.max_code_attempts,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, code: &str, locale: &str) -> ReplayResult<ReplayRecord> {
        let Some(mut record) = self.store.find_active_by_code(code).await? else {
            return Err(self.not_found(locale).await);
        };

        record.deleted = true;
        record.updated_at = Utc::now();

        // A concurrent delete may have won between the lookup and the update.
        match self.store.update(record).await? {
            Some(updated) => {
                info!(code = %updated.code, "Replay soft-deleted");
                Ok(updated)
            },
            None => Err(self.not_found(locale).await),
        }
    }

    pub async fn find(&self, code: &str, locale: &str) -> ReplayResult<ReplayRecord> {
        match self.store.find_active_by_code(code).await? {
            Some(record) => Ok(record),
            None => Err(self.not_found(locale).await),
        }
    }

    pub async fn list(&self, filter: &ReplayFilter) -> ReplayResult<(Vec<ReplayRecord>, i64)> {
        Ok(self.store.list(filter).await?)
    }

    async fn duplicate_hash(&self, locale: &str) -> ReplayError {
        ReplayError::DuplicateHash {
            message: resolve_message(
                self.messages.as_ref(),
                locale,
                DUPLICATE_HASH_KEY,
                DUPLICATE_HASH_FALLBACK,
            )
            .await,
            log: self.log_policy.duplicate_hash,
        }
    }

    async fn not_found(&self, locale: &str) -> ReplayError {
        ReplayError::NotFound {
            message: resolve_message(
                self.messages.as_ref(),
                locale,
                NOT_FOUND_KEY,
                NOT_FOUND_FALLBACK,
            )
            .await,
            log: self.log_policy.not_found,
        }
    }
}
