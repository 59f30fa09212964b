//! Speech-to-text client (Whisper-compatible wire format).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::domain::Credentials;

use super::{error_from_response, require_key, PipelineError};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Seam for the transcription stage
#[async_trait]
pub trait Transcribe: Send + Sync {
    /// Transcribe one WAV-encoded audio segment, returning plain text
    async fn transcribe(
        &self,
        credentials: &Credentials,
        audio_wav: &[u8],
        language: &str,
    ) -> Result<String, PipelineError>;
}

/// HTTP client for a Whisper-shaped transcription endpoint
pub struct WhisperClient {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperClient {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WhisperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcribe for WhisperClient {
    async fn transcribe(
        &self,
        credentials: &Credentials,
        audio_wav: &[u8],
        language: &str,
    ) -> Result<String, PipelineError> {
        let key = require_key("transcription", &credentials.transcription_key)?;

        let file_part = Part::bytes(audio_wav.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", language.to_string());

        debug!(bytes = audio_wav.len(), "Sending segment for transcription");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        // Endpoint is unroutable: a Configuration error proves no call was made
        let client = WhisperClient::with_endpoint("http://[::1]:1/v1", DEFAULT_MODEL);
        let err = client
            .transcribe(&Credentials::default(), b"RIFF", "ko")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration("transcription")));
    }
}
