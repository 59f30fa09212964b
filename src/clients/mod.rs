//! Remote API clients for the transcription → summarization → note-sink chain.
//!
//! Each client sits behind an async trait so the pipeline can run against
//! fakes in tests. Credentials are passed per call rather than held by the
//! client: the pipeline re-reads them from the store before every remote
//! call, so edits take effect mid-session.

pub mod notesink;
pub mod summarization;
pub mod transcription;

use thiserror::Error;

pub use notesink::{parent_reference, NoteSink, NotionSink};
pub use summarization::{parse_note_body, ChatSummarizer, NoteBody, Summarize, KEYWORD_MARKER};
pub use transcription::{Transcribe, WhisperClient};

/// Errors a remote call can produce.
///
/// Content below a size or length threshold is a silent skip handled by the
/// caller, never an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required credential is missing; detected before any network call
    #[error("missing credential: {0}")]
    Configuration(&'static str),

    /// The remote service rejected the configured credential
    #[error("credential rejected by remote service (status {status})")]
    Auth { status: u16 },

    /// The remote call failed for a reason other than authentication
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure before an HTTP status was received
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Pre-flight credential check shared by every client
pub(crate) fn require_key<'a>(
    name: &'static str,
    value: &'a str,
) -> Result<&'a str, PipelineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(PipelineError::Configuration(name))
    } else {
        Ok(trimmed)
    }
}

/// Map a non-success response into the error taxonomy, pulling the service's
/// own message out of the body when one is present.
pub(crate) async fn error_from_response(response: reqwest::Response) -> PipelineError {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return PipelineError::Auth {
            status: status.as_u16(),
        };
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            // OpenAI nests under error.message; Notion uses a flat message
            body.pointer("/error/message")
                .or_else(|| body.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    PipelineError::Upstream {
        status: status.as_u16(),
        message,
    }
}
