//! Summarization stage.

use crate::config::SummarizationConfig;
use crate::error::{PipelineError, Result};
use crate::types::EpisodeId;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Produces a summary from an episode transcript
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize the given transcript
    async fn summarize(&self, id: EpisodeId, title: &str, transcript: &str) -> Result<String>;
}

/// Chat-completion response envelope (the parts we read)
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    pub(crate) choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    pub(crate) message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionMessage {
    pub(crate) content: String,
}

/// HTTP chat-completion summarizer
pub struct ChatSummarizer {
    config: SummarizationConfig,
    client: reqwest::Client,
}

impl ChatSummarizer {
    /// Create a new summarization client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: SummarizationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                crate::Error::Other(format!("Failed to create summarization HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

/// Truncate a transcript to at most `max_chars`, on a char boundary
pub(crate) fn truncate_transcript(transcript: &str, max_chars: usize) -> &str {
    match transcript.char_indices().nth(max_chars) {
        Some((idx, _)) => &transcript[..idx],
        None => transcript,
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, id: EpisodeId, title: &str, transcript: &str) -> Result<String> {
        let excerpt = truncate_transcript(transcript, self.config.max_prompt_chars);
        debug!(episode_id = %id, chars = excerpt.len(), "Requesting summary");

        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You summarize podcast episodes. Write a concise summary \
                                of the main points in a few short paragraphs.",
                },
                {
                    "role": "user",
                    "content": format!("Episode: {}\n\nTranscript:\n{}", title, excerpt),
                },
            ],
        });

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::SummarizationFailed {
                id: id.get(),
                reason: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::SummarizationFailed {
                id: id.get(),
                reason: format!("HTTP {}: {}", status.as_u16(), error_text),
            }
            .into());
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::SummarizationFailed {
                    id: id.get(),
                    reason: format!("response parse failed: {}", e),
                })?;

        let summary = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::SummarizationFailed {
                id: id.get(),
                reason: "response contained no choices".to_string(),
            })?;

        debug!(episode_id = %id, chars = summary.len(), "Summary received");
        Ok(summary.trim().to_string())
    }
}
