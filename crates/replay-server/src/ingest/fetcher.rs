//! Artifact download over HTTP

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::IngestConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Artifact at {url} has an empty body")]
    EmptyPayload { url: String },

    #[error("Artifact exceeds the {limit} byte limit")]
    OversizedPayload { limit: u64 },

    #[error("Artifact download cancelled")]
    Cancelled,
}

/// Source of raw replay artifacts
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Download the whole artifact at `url`, aborting as soon as `cancel` fires
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError>;
}

/// Streams artifacts with reqwest, buffering at most `max_bytes`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &IngestConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_payload_bytes,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(FetchError::OversizedPayload {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::OversizedPayload {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl ArtifactSource for HttpFetcher {
    #[tracing::instrument(skip(self, cancel), fields(bytes))]
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Download cancelled by caller");
                return Err(FetchError::Cancelled);
            }
            result = self.download(url) => result?,
        };

        if body.is_empty() {
            return Err(FetchError::EmptyPayload {
                url: url.to_string(),
            });
        }

        tracing::Span::current().record("bytes", body.len());
        tracing::debug!(bytes = body.len(), "Artifact downloaded");

        Ok(body)
    }
}
