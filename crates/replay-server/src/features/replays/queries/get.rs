use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::ingest::ReplayIngestor;
use crate::models::ReplayRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetReplayQuery {
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetReplayError {
    #[error("Replay code is required")]
    CodeRequired,
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

#[tracing::instrument(skip(ingestor))]
pub async fn handle(
    ingestor: &ReplayIngestor,
    query: GetReplayQuery,
    locale: &str,
) -> Result<ReplayRecord, GetReplayError> {
    if query.code.trim().is_empty() {
        return Err(GetReplayError::CodeRequired);
    }

    Ok(ingestor.find(&query.code, locale).await?)
}
