//! Episode audio fetching.

use crate::error::{PipelineError, Result};
use crate::types::EpisodeId;
use futures::StreamExt;
use tracing::debug;

/// Downloads episode audio with a hard size cap
pub struct AudioFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl AudioFetcher {
    /// Create a new audio fetcher
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(timeout: std::time::Duration, max_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                crate::Error::Other(format!("Failed to create audio HTTP client: {}", e))
            })?;

        Ok(Self { client, max_bytes })
    }

    /// Download the audio for an episode
    ///
    /// The declared Content-Length is checked before any bytes are read, and
    /// the cap is enforced again while streaming in case the header lied.
    pub async fn fetch(&self, id: EpisodeId, url: &str) -> Result<Vec<u8>> {
        debug!(episode_id = %id, url = %url, "Fetching episode audio");

        let response = self.client.get(url).send().await.map_err(|e| {
            PipelineError::AudioFetchFailed {
                id: id.get(),
                reason: format!("request failed: {}", e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::AudioFetchFailed {
                id: id.get(),
                reason: format!("HTTP {}", status.as_u16()),
            }
            .into());
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(PipelineError::AudioTooLarge {
                    id: id.get(),
                    size_bytes: declared,
                    limit_bytes: self.max_bytes,
                }
                .into());
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::AudioFetchFailed {
                id: id.get(),
                reason: format!("read failed: {}", e),
            })?;

            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(PipelineError::AudioTooLarge {
                    id: id.get(),
                    size_bytes: (body.len() + chunk.len()) as u64,
                    limit_bytes: self.max_bytes,
                }
                .into());
            }
            body.extend_from_slice(&chunk);
        }

        debug!(episode_id = %id, bytes = body.len(), "Audio fetch complete");
        Ok(body)
    }
}
