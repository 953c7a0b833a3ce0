use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::features::shared::validation::{validate_length, ValidationError};
use crate::ingest::ReplayIngestor;
use crate::models::ReplayRecord;

pub const CODE_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReplayCommand {
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteReplayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl DeleteReplayCommand {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_length(&self.code, "code", CODE_MAX_LENGTH)
    }
}

#[tracing::instrument(skip(ingestor))]
pub async fn handle(
    ingestor: &ReplayIngestor,
    command: DeleteReplayCommand,
    locale: &str,
) -> Result<ReplayRecord, DeleteReplayError> {
    command.validate()?;

    Ok(ingestor.soft_delete(&command.code, locale).await?)
}
