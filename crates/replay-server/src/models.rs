//! Replay domain records

use chrono::{DateTime, Utc};
use replay_common::types::GameType;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    pub id: i64,
    pub code: String,
    pub file_name: String,
    pub source_url: String,
    /// Parsed `statsJson` value extracted from the artifact
    pub payload: serde_json::Value,
    pub content_hash: String,
    #[sqlx(try_from = "String")]
    pub game_type: GameType,
    pub creator: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(rename = "is_deleted")]
    pub deleted: bool,
}

/// Row handed to the store by the ingestor; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewReplay {
    pub code: String,
    pub file_name: String,
    pub source_url: String,
    pub payload: serde_json::Value,
    pub content_hash: String,
    pub game_type: GameType,
    pub creator: String,
    pub owner_id: String,
}

/// Caller input to [`crate::ingest::ReplayIngestor::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayUpload {
    pub file_name: String,
    pub file_url: String,
    pub game_type: Option<GameType>,
    pub creator: String,
    pub owner_id: String,
}

/// Filters for listing active replays, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayFilter {
    pub owner_id: Option<String>,
    pub game_type: Option<GameType>,
    /// Substring matched against file name or code
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ReplayFilter {
    pub fn matches(&self, record: &ReplayRecord) -> bool {
        if record.deleted {
            return false;
        }
        if let Some(owner_id) = &self.owner_id {
            if &record.owner_id != owner_id {
                return false;
            }
        }
        if let Some(game_type) = self.game_type {
            if record.game_type != game_type {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !record.file_name.to_lowercase().contains(&needle)
                && !record.code.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}
