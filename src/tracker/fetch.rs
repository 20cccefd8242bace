//! Transcript payload download.
//!
//! The transcript URL returned by the notetaker service points at a
//! pre-signed blob. Fetching it is a single bounded attempt; failures are
//! reported with enough detail for a terminal failure reason.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Network(String),
}

/// Seam for downloading a transcript payload.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpTranscriptFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTranscriptFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl TranscriptFetcher for HttpTranscriptFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout.as_secs())
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
