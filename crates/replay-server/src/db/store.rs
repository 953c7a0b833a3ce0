use async_trait::async_trait;

use super::{RecordScope, StoreResult};
use crate::models::{NewReplay, ReplayFilter, ReplayRecord};

/// Persistence contract consumed by the ingestion pipeline.
///
/// Implementations must enforce two constraints on `insert`: `code` is unique
/// over all rows, and (`content_hash`, `owner_id`) is unique over active rows.
/// Violations are reported as [`super::StoreError::UniqueViolation`].
#[async_trait]
pub trait ReplayStore: Send + Sync {
    async fn insert(&self, replay: NewReplay) -> StoreResult<ReplayRecord>;

    async fn find_by_hash_and_owner(
        &self,
        content_hash: &str,
        owner_id: &str,
        scope: RecordScope,
    ) -> StoreResult<Option<ReplayRecord>>;

    /// Highest code starting with `prefix` whose remainder is a decimal number,
    /// compared numerically
    async fn find_max_code_with_prefix(
        &self,
        prefix: &str,
        scope: RecordScope,
    ) -> StoreResult<Option<String>>;

    async fn find_active_by_code(&self, code: &str) -> StoreResult<Option<ReplayRecord>>;

    /// Writes `deleted` and refreshes `updated_at`. Returns `None` when the row
    /// is missing or was already soft-deleted.
    async fn update(&self, record: ReplayRecord) -> StoreResult<Option<ReplayRecord>>;

    /// Active rows matching `filter` and the total before paging
    async fn list(&self, filter: &ReplayFilter) -> StoreResult<(Vec<ReplayRecord>, i64)>;
}
