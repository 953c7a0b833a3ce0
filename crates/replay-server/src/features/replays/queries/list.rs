use replay_common::types::GameType;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::features::shared::pagination::{PaginationMetadata, PaginationParams};
use crate::ingest::ReplayIngestor;
use crate::models::{ReplayFilter, ReplayRecord};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListReplaysQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    /// Matched against file name and code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListReplaysResponse {
    pub items: Vec<ReplayRecord>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ListReplaysError {
    #[error("{0}")]
    InvalidPagination(&'static str),
    #[error("gameType must be exactly 1 character")]
    InvalidGameType,
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl ListReplaysQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    pub fn validate(&self) -> Result<(), ListReplaysError> {
        self.pagination()
            .validate()
            .map_err(ListReplaysError::InvalidPagination)
    }

    fn to_filter(&self) -> Result<ReplayFilter, ListReplaysError> {
        let pagination = self.pagination();
        let game_type = self
            .game_type
            .as_deref()
            .map(str::parse::<GameType>)
            .transpose()
            .map_err(|_| ListReplaysError::InvalidGameType)?;

        Ok(ReplayFilter {
            owner_id: self.owner_id.clone().filter(|s| !s.is_empty()),
            game_type,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            limit: pagination.per_page(),
            offset: pagination.offset(),
        })
    }
}

#[tracing::instrument(skip(ingestor))]
pub async fn handle(
    ingestor: &ReplayIngestor,
    query: ListReplaysQuery,
) -> Result<ListReplaysResponse, ListReplaysError> {
    query.validate()?;
    let filter = query.to_filter()?;
    let pagination = query.pagination();

    let (items, total) = ingestor.list(&filter).await?;

    Ok(ListReplaysResponse {
        items,
        pagination: PaginationMetadata::new(pagination.page(), pagination.per_page(), total),
    })
}
