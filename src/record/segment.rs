//! Segment accumulation and in-memory WAV encoding.

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::audio::AudioFrame;

/// One fixed-duration slice of captured audio, encoded for upload
#[derive(Debug, Clone)]
pub struct Segment {
    /// Segment number within the session (0-indexed)
    pub index: usize,
    /// When the first frame of this segment arrived
    pub captured_at: DateTime<Utc>,
    /// WAV-encoded audio bytes
    pub wav: Vec<u8>,
}

impl Segment {
    /// Short content hash used to tag log lines (first 12 hex chars)
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.wav);
        format!("{:x}", hasher.finalize())[..12].to_string()
    }
}

/// Accumulates frames for the segment currently being captured.
///
/// `rotate` closes the current segment and opens the next one; the
/// coordinator calls it on every timer tick and once more on stop.
pub struct SegmentBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    index: usize,
    started_at: Option<DateTime<Utc>>,
}

impl SegmentBuffer {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: 16000,
            channels: 1,
            index: 0,
            started_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a frame to the open segment, adopting the stream's format
    /// from the first frame seen
    pub fn push(&mut self, frame: &AudioFrame) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
            self.sample_rate = frame.sample_rate;
            self.channels = frame.channels;
        }
        self.samples.extend_from_slice(&frame.samples);
    }

    /// Close the current segment and open a new one.
    ///
    /// Returns `None` when no frames arrived since the last rotation.
    pub fn rotate(&mut self) -> Result<Option<Segment>> {
        if self.samples.is_empty() {
            return Ok(None);
        }

        let samples = std::mem::take(&mut self.samples);
        let captured_at = self.started_at.take().unwrap_or_else(Utc::now);
        let wav = encode_wav(&samples, self.sample_rate, self.channels)?;

        let segment = Segment {
            index: self.index,
            captured_at,
            wav,
        };
        self.index += 1;

        Ok(Some(segment))
    }
}

impl Default for SegmentBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode PCM samples as a WAV byte buffer
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .context("Failed to create WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV buffer")?;
        }
        writer.finalize().context("Failed to finalize WAV buffer")?;
    }

    Ok(cursor.into_inner())
}
