//! User-supplied API credentials and cached remote state.

use serde::{Deserialize, Serialize};

/// API credentials for the three remote services.
///
/// Stored once under the `credentials` key and re-read before every remote
/// call, so edits made while a session is running take effect on the next
/// segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Speech-to-text API key
    #[serde(default)]
    pub transcription_key: String,

    /// Language-model API key
    #[serde(default)]
    pub summarization_key: String,

    /// Note-sink integration token
    #[serde(default)]
    pub note_sink_token: String,

    /// Parent page or database the session container is created under
    #[serde(default)]
    pub note_sink_parent_id: String,
}

impl Credentials {
    pub fn has_transcription_key(&self) -> bool {
        !self.transcription_key.trim().is_empty()
    }

    /// The note sink is optional: both token and parent must be present
    /// before a remote save is attempted
    pub fn note_sink_configured(&self) -> bool {
        !self.note_sink_token.trim().is_empty() && !self.note_sink_parent_id.trim().is_empty()
    }
}

/// Remote state cached per session under the `remoteConfig` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Note-sink container created lazily on the first successful summary,
    /// reused by every later note in the session
    #[serde(default)]
    pub container_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_sink_requires_token_and_parent() {
        let mut creds = Credentials {
            note_sink_token: "secret".to_string(),
            ..Default::default()
        };
        assert!(!creds.note_sink_configured());

        creds.note_sink_parent_id = "abc123".to_string();
        assert!(creds.note_sink_configured());
    }

    #[test]
    fn test_defaults_deserialize_from_empty_object() {
        let creds: Credentials = serde_json::from_str("{}").unwrap();
        assert!(!creds.has_transcription_key());

        let remote: RemoteConfig = serde_json::from_str("{}").unwrap();
        assert!(remote.container_id.is_none());
    }
}
