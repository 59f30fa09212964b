//! Key-value store for settings, session state, and rendered notes.
//!
//! The store is a flat map of named JSON blobs with last-write-wins
//! semantics: no transactions, no versioning, no compare-and-swap. Consumers
//! performing read-modify-write sequences must re-read through the typed
//! accessors immediately before writing so concurrent presenter edits are
//! not clobbered more than necessary.

pub mod json_file;
pub mod memory;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::domain::{Credentials, Note, RemoteConfig, Session};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Well-known top-level keys
pub const KEY_CREDENTIALS: &str = "credentials";
pub const KEY_SESSION: &str = "session";
pub const KEY_REMOTE_CONFIG: &str = "remoteConfig";
pub const KEY_RENDERED_NOTES: &str = "renderedNotes";

/// Raw blob interface implemented by every store backend
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the blob stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the blob stored under `key` (last write wins)
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Typed accessors over the raw blob interface.
///
/// Cloning the handle shares the underlying store.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn Store>,
}

impl StoreHandle {
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self { inner }
    }

    /// Access the raw store, e.g. for keys outside the well-known set
    pub fn raw(&self) -> &dyn Store {
        self.inner.as_ref()
    }

    /// Stored credentials, defaulting to empty fields when unset
    pub async fn credentials(&self) -> Result<Credentials> {
        match self.inner.get(KEY_CREDENTIALS).await? {
            Some(value) => {
                serde_json::from_value(value).context("Failed to parse stored credentials")
            }
            None => Ok(Credentials::default()),
        }
    }

    pub async fn set_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.inner
            .set(KEY_CREDENTIALS, serde_json::to_value(credentials)?)
            .await
    }

    pub async fn session(&self) -> Result<Option<Session>> {
        match self.inner.get(KEY_SESSION).await? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).context("Failed to parse stored session")?,
            )),
            None => Ok(None),
        }
    }

    pub async fn set_session(&self, session: &Session) -> Result<()> {
        self.inner
            .set(KEY_SESSION, serde_json::to_value(session)?)
            .await
    }

    pub async fn remote_config(&self) -> Result<RemoteConfig> {
        match self.inner.get(KEY_REMOTE_CONFIG).await? {
            Some(value) => {
                serde_json::from_value(value).context("Failed to parse stored remote config")
            }
            None => Ok(RemoteConfig::default()),
        }
    }

    pub async fn set_remote_config(&self, config: &RemoteConfig) -> Result<()> {
        self.inner
            .set(KEY_REMOTE_CONFIG, serde_json::to_value(config)?)
            .await
    }

    /// Last-rendered presenter snapshot, used for restart recovery
    pub async fn rendered_notes(&self) -> Result<Option<String>> {
        Ok(self
            .inner
            .get(KEY_RENDERED_NOTES)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub async fn set_rendered_notes(&self, rendered: &str) -> Result<()> {
        self.inner
            .set(KEY_RENDERED_NOTES, Value::String(rendered.to_string()))
            .await
    }

    /// Append a note to the current session.
    ///
    /// Re-reads the session first so notes appended by concurrent segment
    /// pipelines are not lost. Fails when no session exists: notes are only
    /// produced while a session is active.
    pub async fn append_note(&self, note: &Note) -> Result<()> {
        let mut session = self
            .session()
            .await?
            .context("No active session to append a note to")?;
        session.notes.push(note.clone());
        self.set_session(&session).await
    }

    /// Flip `saved_remotely` on the note with the given timestamp.
    ///
    /// Persisted before any saved-notification is published, so a lost
    /// notification cannot leave the stored note permanently unsaved.
    pub async fn mark_note_saved(&self, timestamp: &str) -> Result<()> {
        let mut session = self
            .session()
            .await?
            .context("No active session to mark a note in")?;
        if !session.mark_saved(timestamp) {
            warn!(timestamp, "No note with this timestamp to mark saved");
            return Ok(());
        }
        self.set_session(&session).await
    }
}
