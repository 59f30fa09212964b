//! Per-segment pipeline: transcribe → summarize → persist → remote save.
//!
//! Each segment runs inside its own spawned task with its own error
//! boundary; a failing segment publishes an error event and never interrupts
//! the recording loop. The note-sink stage is downgraded further: its
//! failures leave the locally stored note authoritative.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, UiEvent};
use crate::clients::{NoteSink, Summarize, Transcribe};
use crate::domain::{Credentials, Note};
use crate::store::StoreHandle;

use super::segment::Segment;

/// Transcripts at or below this many characters are treated as "no content"
/// and skipped before summarization. A cost guard, not an error.
pub const MIN_TRANSCRIPT_CHARS: usize = 10;

/// Everything a segment pipeline needs, injected once at coordinator
/// construction
pub struct PipelineDeps {
    pub store: StoreHandle,
    pub bus: Arc<dyn EventBus>,
    pub transcriber: Arc<dyn Transcribe>,
    pub summarizer: Arc<dyn Summarize>,
    pub sink: Arc<dyn NoteSink>,
    /// Language hint forwarded to the transcription endpoint
    pub language: String,
}

/// Task entry point with the error boundary for one segment
pub async fn run_segment_task(deps: Arc<PipelineDeps>, segment: Segment) {
    let segment_id = segment.id();
    let index = segment.index;

    match process_segment(&deps, segment).await {
        Ok(Some(note)) => {
            info!(segment = %segment_id, index, timestamp = %note.timestamp, "Segment pipeline complete");
        }
        Ok(None) => {
            debug!(segment = %segment_id, index, "Segment produced no content");
        }
        Err(e) => {
            error!(segment = %segment_id, index, error = %e, "Segment pipeline failed");
            deps.bus.publish(UiEvent::Error {
                message: format!("segment {}: {}", segment_id, e),
            });
        }
    }
}

/// Run one segment through the full chain, returning the note it produced
/// (if any).
///
/// The note is appended to the session before the remote save is attempted:
/// local durability precedes remote durability, and a sink failure never
/// rolls the note back.
pub async fn process_segment(deps: &PipelineDeps, segment: Segment) -> Result<Option<Note>> {
    // Credentials are re-read per call so mid-session edits apply
    let credentials = deps.store.credentials().await?;

    let text = deps
        .transcriber
        .transcribe(&credentials, &segment.wav, &deps.language)
        .await?;

    let trimmed = text.trim();
    if trimmed.chars().count() <= MIN_TRANSCRIPT_CHARS {
        debug!(chars = trimmed.chars().count(), "Transcript too short, skipping summarization");
        return Ok(None);
    }

    let body = deps.summarizer.summarize(&credentials, trimmed).await?;
    let note = Note::new(trimmed.to_string(), body.summary, body.keywords);

    deps.store.append_note(&note).await?;
    deps.bus.publish(UiEvent::NewNote { note: note.clone() });

    if let Err(e) = save_remotely(deps, &note).await {
        warn!(timestamp = %note.timestamp, error = %e, "Remote save failed, note kept locally");
        deps.bus.publish(UiEvent::SinkError {
            message: e.to_string(),
        });
    }

    Ok(Some(note))
}

/// Append the note to the remote container, creating the container lazily
/// on the first save of the session.
///
/// Returns Ok(false) when the sink is not configured; the note then stays
/// local-only without an error.
async fn save_remotely(deps: &PipelineDeps, note: &Note) -> Result<bool> {
    let credentials = deps.store.credentials().await?;
    if !credentials.note_sink_configured() {
        debug!("Note sink not configured, keeping note local only");
        return Ok(false);
    }

    let container_id = ensure_container(deps, &credentials).await?;
    deps.sink
        .append_content(&credentials, &container_id, note)
        .await?;

    // Persist the saved flag before notifying: a lost notification must not
    // leave the stored note permanently unsaved
    deps.store.mark_note_saved(&note.timestamp).await?;
    deps.bus.publish(UiEvent::NoteSaved {
        timestamp: note.timestamp.clone(),
    });

    Ok(true)
}

/// Return the cached session container, creating it on first use
async fn ensure_container(deps: &PipelineDeps, credentials: &Credentials) -> Result<String> {
    let mut remote = deps.store.remote_config().await?;
    if let Some(container_id) = remote.container_id {
        return Ok(container_id);
    }

    let title = deps
        .store
        .session()
        .await?
        .map(|s| s.title)
        .unwrap_or_else(|| "강의 노트".to_string());

    let container_id = deps.sink.create_container(credentials, &title).await?;
    info!(container_id = %container_id, "Created note container");

    remote.container_id = Some(container_id.clone());
    deps.store.set_remote_config(&remote).await?;

    Ok(container_id)
}
