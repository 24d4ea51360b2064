//! Topic-relevance flagging stage.

use crate::config::SummarizationConfig;
use crate::db::TopicRow;
use crate::error::{PipelineError, Result};
use crate::types::{EpisodeId, TopicFlag};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::summarize::{CompletionResponse, truncate_transcript};

/// Decides topic relevance for an episode
#[async_trait]
pub trait TopicFlagger: Send + Sync {
    /// Evaluate the episode against each topic
    async fn flag(
        &self,
        id: EpisodeId,
        summary: &str,
        transcript: &str,
        topics: &[TopicRow],
    ) -> Result<Vec<TopicFlag>>;
}

/// One relevance decision as returned by the model
#[derive(Debug, Deserialize)]
struct RawFlag {
    topic: String,
    relevant: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// HTTP chat-completion topic flagger
///
/// Shares the chat-completion endpoint with the summarizer; the model is
/// asked for a JSON array of `{"topic", "relevant", "reason"}` objects.
pub struct ChatTopicFlagger {
    config: SummarizationConfig,
    client: reqwest::Client,
}

impl ChatTopicFlagger {
    /// Create a new topic-flagging client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: SummarizationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                crate::Error::Other(format!("Failed to create flagging HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

/// Extract the first JSON array from model output
///
/// Models wrap JSON in prose or code fences often enough that a plain
/// `from_str` on the whole response is unreliable.
fn extract_json_array(content: &str) -> Option<&str> {
    let start = content.find('[')?;
    let end = content.rfind(']')?;
    if end > start {
        Some(&content[start..=end])
    } else {
        None
    }
}

/// Parse model output into flags, keeping only decisions for known topics
fn parse_flags(id: EpisodeId, content: &str, topics: &[TopicRow]) -> Result<Vec<TopicFlag>> {
    let array = extract_json_array(content).ok_or_else(|| PipelineError::FlaggingFailed {
        id: id.get(),
        reason: "response contained no JSON array".to_string(),
    })?;

    let raw: Vec<RawFlag> =
        serde_json::from_str(array).map_err(|e| PipelineError::FlaggingFailed {
            id: id.get(),
            reason: format!("malformed flag JSON: {}", e),
        })?;

    let flags = raw
        .into_iter()
        .filter(|f| {
            topics
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(&f.topic))
        })
        .map(|f| TopicFlag {
            topic: f.topic,
            relevant: f.relevant,
            reason: f.reason,
        })
        .collect();

    Ok(flags)
}

#[async_trait]
impl TopicFlagger for ChatTopicFlagger {
    async fn flag(
        &self,
        id: EpisodeId,
        summary: &str,
        transcript: &str,
        topics: &[TopicRow],
    ) -> Result<Vec<TopicFlag>> {
        if topics.is_empty() {
            return Ok(vec![]);
        }

        let topic_list: Vec<String> = topics
            .iter()
            .map(|t| match &t.description {
                Some(desc) => format!("- {}: {}", t.name, desc),
                None => format!("- {}", t.name),
            })
            .collect();

        let excerpt = truncate_transcript(transcript, self.config.max_prompt_chars);
        debug!(episode_id = %id, topics = topics.len(), "Requesting topic flags");

        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You decide whether a podcast episode is relevant to each \
                                listed topic. Respond with only a JSON array of objects \
                                {\"topic\": string, \"relevant\": bool, \"reason\": string}, \
                                one object per topic.",
                },
                {
                    "role": "user",
                    "content": format!(
                        "Topics:\n{}\n\nSummary:\n{}\n\nTranscript excerpt:\n{}",
                        topic_list.join("\n"),
                        summary,
                        excerpt
                    ),
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
            .map_err(|e| PipelineError::FlaggingFailed {
                id: id.get(),
                reason: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::FlaggingFailed {
                id: id.get(),
                reason: format!("HTTP {}: {}", status.as_u16(), error_text),
            }
            .into());
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::FlaggingFailed {
                    id: id.get(),
                    reason: format!("response parse failed: {}", e),
                })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::FlaggingFailed {
                id: id.get(),
                reason: "response contained no choices".to_string(),
            })?;

        parse_flags(id, &content, topics)
    }
}
