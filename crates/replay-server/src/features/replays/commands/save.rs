use replay_common::types::GameType;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ReplayError;
use crate::features::shared::validation::{
    validate_exact_length, validate_length, validate_url, ValidationError,
};
use crate::ingest::ReplayIngestor;
use crate::models::{ReplayRecord, ReplayUpload};

pub const FILE_NAME_MAX_LENGTH: usize = 128;
pub const FILE_URL_MAX_LENGTH: usize = 255;
pub const CREATOR_MAX_LENGTH: usize = 255;
pub const OWNER_ID_MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReplayCommand {
    pub file_name: String,
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    pub creator: String,
    pub owner_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveReplayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl SaveReplayCommand {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_length(&self.file_name, "fileName", FILE_NAME_MAX_LENGTH)?;
        validate_url(&self.file_url, "fileUrl", FILE_URL_MAX_LENGTH)?;
        if let Some(game_type) = &self.game_type {
            validate_exact_length(game_type, "gameType", 1)?;
        }
        validate_length(&self.creator, "creator", CREATOR_MAX_LENGTH)?;
        validate_length(&self.owner_id, "ownerId", OWNER_ID_MAX_LENGTH)?;
        Ok(())
    }

    fn into_upload(self) -> Result<ReplayUpload, ValidationError> {
        let game_type = self
            .game_type
            .as_deref()
            .map(str::parse::<GameType>)
            .transpose()
            .map_err(|_| ValidationError::ExactLength {
                field: "gameType",
                length: 1,
            })?;

        Ok(ReplayUpload {
            file_name: self.file_name,
            file_url: self.file_url,
            game_type,
            creator: self.creator,
            owner_id: self.owner_id,
        })
    }
}

#[tracing::instrument(skip(ingestor, command, cancel), fields(file_name = %command.file_name))]
pub async fn handle(
    ingestor: &ReplayIngestor,
    command: SaveReplayCommand,
    locale: &str,
    cancel: &CancellationToken,
) -> Result<ReplayRecord, SaveReplayError> {
    command.validate()?;
    let upload = command.into_upload()?;

    Ok(ingestor.save(upload, locale, cancel).await?)
}
