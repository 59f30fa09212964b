//! Recording session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::note::Note;

/// State of one recording session.
///
/// Created when recording starts and cleared when the next session starts.
/// The coordinator appends a [`Note`] per processed segment; the store holds
/// the session under the `session` key with last-write-wins semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: Uuid,

    /// Whether the coordinator is currently capturing
    pub recording: bool,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Lecture title, also used for the remote container title
    pub title: String,

    /// Notes in capture order (oldest first)
    pub notes: Vec<Note>,
}

impl Session {
    /// Create a fresh session in the recording state
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recording: true,
            started_at: Utc::now(),
            title: title.into(),
            notes: Vec::new(),
        }
    }

    /// Mark the most recent note with the given timestamp as saved remotely.
    ///
    /// Returns false when no note matches (e.g. the session was cleared
    /// between the append and the remote ack).
    pub fn mark_saved(&mut self, timestamp: &str) -> bool {
        if let Some(note) = self
            .notes
            .iter_mut()
            .rev()
            .find(|n| n.timestamp == timestamp)
        {
            note.saved_remotely = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_saved_matches_latest() {
        let mut session = Session::new("수업");
        let mut a = Note::new("a".into(), "• a".into(), vec![]);
        a.timestamp = "10:00:00".to_string();
        let mut b = Note::new("b".into(), "• b".into(), vec![]);
        b.timestamp = "10:00:00".to_string();
        session.notes.push(a);
        session.notes.push(b);

        assert!(session.mark_saved("10:00:00"));
        assert!(!session.notes[0].saved_remotely);
        assert!(session.notes[1].saved_remotely);
    }

    #[test]
    fn test_mark_saved_missing_timestamp() {
        let mut session = Session::new("수업");
        assert!(!session.mark_saved("23:59:59"));
    }
}
