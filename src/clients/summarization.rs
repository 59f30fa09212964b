//! Summarization client (chat-completions wire format) and the structured
//! response parser.
//!
//! The model is instructed to answer with two paragraphs: a bullet summary,
//! then a single `키워드:` line with a comma-separated keyword list. The
//! parser splits on the first blank line; a missing second paragraph means
//! no keywords.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::domain::Credentials;

use super::{error_from_response, require_key, PipelineError};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Marker prefixing the keyword list in the model's second paragraph
pub const KEYWORD_MARKER: &str = "키워드:";

const SYSTEM_PROMPT: &str = "당신은 강의 필기 도우미입니다. 주어진 텍스트를 간단하게 정리하고 핵심 단어를 추출하세요. 텍스트가 짧아도 상관없습니다.\n\n출력 형식:\n• [핵심 내용 1]\n• [핵심 내용 2]\n\n키워드: [단어1, 단어2, 단어3]\n\n절대 하지 말 것: \"정보가 부족하다\", \"더 많은 내용이 필요하다\" 같은 말. 주어진 것만 정리하세요.";

/// Structured note body parsed from the model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteBody {
    /// Bullet-style summary, glyphs intact
    pub summary: String,
    /// Parsed keyword list, possibly empty
    pub keywords: Vec<String>,
}

/// Seam for the summarization stage
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(
        &self,
        credentials: &Credentials,
        transcript: &str,
    ) -> Result<NoteBody, PipelineError>;
}

/// HTTP client for a chat-completions-shaped endpoint
pub struct ChatSummarizer {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatSummarizer {
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

impl Default for ChatSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarize for ChatSummarizer {
    async fn summarize(
        &self,
        credentials: &Credentials,
        transcript: &str,
    ) -> Result<NoteBody, PipelineError> {
        let key = require_key("summarization", &credentials.summarization_key)?;

        // Fixed system instruction plus a one-shot example exchange keeps
        // short transcripts from being refused
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": "예시: AI 기술의 발전" },
                { "role": "assistant", "content": "• AI 기술의 발전\n\n키워드: AI, 기술, 발전" },
                { "role": "user", "content": transcript }
            ],
            "temperature": 0.7,
            "max_tokens": 500
        });

        debug!(chars = transcript.chars().count(), "Summarizing transcript");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(parse_note_body(&content))
    }
}

/// Split a model response into summary and keywords.
///
/// Contract: first paragraph is the summary, second paragraph is a line
/// starting with [`KEYWORD_MARKER`] followed by a comma-separated list.
pub fn parse_note_body(content: &str) -> NoteBody {
    let mut parts = content.splitn(2, "\n\n");
    let summary = parts.next().unwrap_or("").to_string();

    let keywords = parts
        .next()
        .map(|paragraph| {
            paragraph
                .replacen(KEYWORD_MARKER, "", 1)
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    NoteBody { summary, keywords }
}
