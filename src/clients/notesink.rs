//! Note-sink client (Notion wire format).
//!
//! Two operations: create a titled container page under a parent reference,
//! and append one note's blocks to an existing container. Container creation
//! happens at most once per session; the pipeline caches the id in the store.

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{Credentials, Note};

use super::{error_from_response, require_key, PipelineError};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// Fixed protocol version sent with every request
pub const NOTION_VERSION: &str = "2022-06-28";

/// Seam for the note-sink stage
#[async_trait]
pub trait NoteSink: Send + Sync {
    /// Create the session container, returning its id
    async fn create_container(
        &self,
        credentials: &Credentials,
        title: &str,
    ) -> Result<String, PipelineError>;

    /// Append one note's blocks to an existing container
    async fn append_content(
        &self,
        credentials: &Credentials,
        container_id: &str,
        note: &Note,
    ) -> Result<(), PipelineError>;
}

/// HTTP client for a Notion-shaped API
pub struct NotionSink {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreatePageResponse {
    id: String,
}

impl NotionSink {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for NotionSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the parent reference for container creation.
///
/// A 36-character hyphenated token is a direct page id; anything else is
/// treated as a database id the container is created under.
pub fn parent_reference(parent_id: &str) -> Value {
    if parent_id.len() == 36 && parent_id.contains('-') {
        json!({ "page_id": parent_id })
    } else {
        json!({ "database_id": parent_id })
    }
}

#[async_trait]
impl NoteSink for NotionSink {
    async fn create_container(
        &self,
        credentials: &Credentials,
        title: &str,
    ) -> Result<String, PipelineError> {
        let token = require_key("note_sink_token", &credentials.note_sink_token)?;
        let parent_id = require_key("note_sink_parent_id", &credentials.note_sink_parent_id)?;

        let now = Local::now();
        let full_title = format!("{} - {}", title, now.format("%Y-%m-%d"));

        let body = json!({
            "parent": parent_reference(parent_id),
            "properties": {
                "title": {
                    "title": [{ "text": { "content": full_title } }]
                }
            },
            "children": [
                {
                    "object": "block",
                    "type": "heading_1",
                    "heading_1": {
                        "rich_text": [{ "text": { "content": "📚 강의 노트" } }]
                    }
                },
                {
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": {
                        "rich_text": [{
                            "text": { "content": format!("생성 시간: {}", now.format("%Y-%m-%d %H:%M:%S")) }
                        }]
                    }
                },
                { "object": "block", "type": "divider", "divider": {} }
            ]
        });

        debug!(title = %full_title, "Creating note container");

        let response = self
            .client
            .post(format!("{}/pages", self.base_url))
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let page: CreatePageResponse = response.json().await?;
        Ok(page.id)
    }

    async fn append_content(
        &self,
        credentials: &Credentials,
        container_id: &str,
        note: &Note,
    ) -> Result<(), PipelineError> {
        let token = require_key("note_sink_token", &credentials.note_sink_token)?;

        let mut blocks = vec![json!({
            "object": "block",
            "type": "heading_3",
            "heading_3": {
                "rich_text": [{
                    "text": { "content": format!("⏰ {}", note.timestamp) },
                    "annotations": { "color": "blue" }
                }]
            }
        })];

        for line in note.summary_lines() {
            blocks.push(json!({
                "object": "block",
                "type": "bulleted_list_item",
                "bulleted_list_item": {
                    "rich_text": [{ "text": { "content": line } }]
                }
            }));
        }

        blocks.push(json!({
            "object": "block",
            "type": "callout",
            "callout": {
                "icon": { "emoji": "🏷️" },
                "color": "gray_background",
                "rich_text": [{
                    "text": { "content": format!("키워드: {}", note.keywords.join(", ")) },
                    "annotations": { "bold": true }
                }]
            }
        }));
        blocks.push(json!({ "object": "block", "type": "divider", "divider": {} }));

        debug!(container_id, timestamp = %note.timestamp, "Appending note blocks");

        let response = self
            .client
            .patch(format!("{}/blocks/{}/children", self.base_url, container_id))
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&json!({ "children": blocks }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenated_36_char_id_is_page_parent() {
        let id = "123e4567-e89b-12d3-a456-426614174000";
        assert_eq!(id.len(), 36);
        assert_eq!(parent_reference(id), json!({ "page_id": id }));
    }

    #[test]
    fn test_other_ids_are_database_parents() {
        // Unhyphenated 32-char id
        let compact = "123e4567e89b12d3a456426614174000";
        assert_eq!(
            parent_reference(compact),
            json!({ "database_id": compact })
        );

        // 36 chars without hyphens
        let long = "a".repeat(36);
        assert_eq!(parent_reference(&long), json!({ "database_id": long }));

        // Hyphenated but wrong length
        assert_eq!(
            parent_reference("abc-def"),
            json!({ "database_id": "abc-def" })
        );
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_network() {
        let sink = NotionSink::with_base_url("http://[::1]:1/v1");
        let note = Note::new("t".into(), "• s".into(), vec![]);
        let err = sink
            .append_content(&Credentials::default(), "page", &note)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration("note_sink_token")
        ));
    }
}
