//! Shared fixtures for replay-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use replay_server::config::IngestConfig;
use replay_server::db::InMemoryReplayStore;
use replay_server::ingest::{ArtifactSource, FetchError, ReplayIngestor};
use replay_server::messages::StaticMessageCatalog;
use replay_server::models::ReplayUpload;

/// Bytes shaped like a replay file: binary header, the corrupted metadata
/// block embedding `stats`, then trailing binary data.
pub fn artifact(stats: &str) -> Vec<u8> {
    let escaped = stats.replace('"', "\\\"");
    let mut bytes = vec![0x00, 0x01, 0x52, 0x49, 0x4f, 0x54, 0xff];
    bytes.extend_from_slice(
        format!(r#"{{"gameLength":1834512,"gameVersion":"14.1","statsJson":"{escaped}"}}"#)
            .as_bytes(),
    );
    bytes.extend_from_slice(&[0x9f, 0x00, 0x7b, 0x10]);
    bytes
}

/// Serves fixed bodies by URL; unknown URLs yield an empty body
#[derive(Default)]
pub struct StaticSource {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }
}

#[async_trait]
impl ArtifactSource for StaticSource {
    async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        tokio::task::yield_now().await;
        match self.bodies.get(url) {
            Some(body) if !body.is_empty() => Ok(body.clone()),
            _ => Err(FetchError::EmptyPayload {
                url: url.to_string(),
            }),
        }
    }
}

/// Never completes until cancelled
pub struct PendingSource;

#[async_trait]
impl ArtifactSource for PendingSource {
    async fn fetch(&self, _url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        cancel.cancelled().await;
        Err(FetchError::Cancelled)
    }
}

pub fn upload(file_name: &str, file_url: &str, owner_id: &str) -> ReplayUpload {
    ReplayUpload {
        file_name: file_name.to_string(),
        file_url: file_url.to_string(),
        game_type: None,
        creator: "alice".to_string(),
        owner_id: owner_id.to_string(),
    }
}

pub fn today() -> String {
    chrono::Utc::now().format("%y%m%d").to_string()
}

pub fn ingestor_with(
    source: impl ArtifactSource + 'static,
    config: &IngestConfig,
) -> (ReplayIngestor, Arc<InMemoryReplayStore>) {
    let store = Arc::new(InMemoryReplayStore::new());
    let ingestor = ReplayIngestor::new(
        store.clone(),
        Arc::new(source),
        Arc::new(StaticMessageCatalog::new()),
        config,
    );
    (ingestor, store)
}
