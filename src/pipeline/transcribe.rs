//! Speech-to-text stage.

use crate::config::TranscriptionConfig;
use crate::error::{PipelineError, Result};
use crate::types::EpisodeId;
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::debug;

/// Converts episode audio into a transcript
///
/// The production implementation talks to an HTTP speech-to-text service;
/// tests substitute their own.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the given audio bytes
    async fn transcribe(&self, id: EpisodeId, audio: Vec<u8>, filename: &str) -> Result<String>;
}

/// Speech-to-text service response
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP transcription client (Whisper-style API)
///
/// Sends a multipart upload (`file` + `model`) to the configured endpoint and
/// expects a JSON `{"text": ...}` response.
pub struct HttpTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl HttpTranscriber {
    /// Create a new transcription client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                crate::Error::Other(format!("Failed to create transcription HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, id: EpisodeId, audio: Vec<u8>, filename: &str) -> Result<String> {
        debug!(episode_id = %id, bytes = audio.len(), "Sending audio for transcription");

        let mime = guess_audio_mime(filename);
        let part = multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| PipelineError::TranscriptionFailed {
                id: id.get(),
                reason: format!("invalid mime type: {}", e),
            })?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::TranscriptionFailed {
                id: id.get(),
                reason: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::TranscriptionFailed {
                id: id.get(),
                reason: format!("HTTP {}: {}", status.as_u16(), error_text),
            }
            .into());
        }

        let body: TranscriptionResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::TranscriptionFailed {
                    id: id.get(),
                    reason: format!("response parse failed: {}", e),
                })?;

        debug!(episode_id = %id, chars = body.text.len(), "Transcription complete");
        Ok(body.text)
    }
}

/// Best-effort MIME type from the audio filename
fn guess_audio_mime(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".m4a") || lower.ends_with(".mp4") {
        "audio/mp4"
    } else if lower.ends_with(".wav") {
        "audio/wav"
    } else if lower.ends_with(".ogg") || lower.ends_with(".opus") {
        "audio/ogg"
    } else {
        "audio/mpeg"
    }
}
