//! A single transcribed-and-summarized note derived from one audio segment.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// One unit of pipeline output.
///
/// Notes are immutable once created, except for `saved_remotely`, which is
/// flipped after a successful note-sink append. A note always reaches the
/// local store before any remote save is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Wall-clock capture time (HH:MM:SS), also used to identify the note
    /// when marking it saved
    pub timestamp: String,

    /// Full transcript the summary was derived from
    pub original_text: String,

    /// Bullet-style summary (glyphs preserved as returned by the model)
    pub summary: String,

    /// Keywords extracted from the summary response
    pub keywords: Vec<String>,

    /// Whether the note-sink append succeeded
    pub saved_remotely: bool,
}

impl Note {
    /// Create a new unsaved note timestamped with the local wall clock
    pub fn new(original_text: String, summary: String, keywords: Vec<String>) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            original_text,
            summary,
            keywords,
            saved_remotely: false,
        }
    }

    /// Non-empty summary lines with their leading bullet glyph stripped
    pub fn summary_lines(&self) -> Vec<&str> {
        self.summary
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(strip_bullet)
            .collect()
    }
}

/// Strip a single leading `•` or `-` bullet glyph and the whitespace after it
pub fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('•')
        .or_else(|| trimmed.strip_prefix('-'))
        .map(|rest| rest.trim_start())
        .unwrap_or(trimmed)
}
