//! Audio frame source seam and the WAV-file replay source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Audio capture seam.
///
/// The coordinator owns a boxed source for the lifetime of a session.
/// Closing the returned channel signals end-of-stream, which drains the
/// in-progress segment through the pipeline.
#[async_trait]
pub trait AudioSource: Send {
    /// Start capturing; returns the frame channel
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the stream
    async fn stop(&mut self) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Replays a WAV file as a frame stream, optionally paced in real time.
///
/// Stands in for live capture; any backend producing [`AudioFrame`]s can be
/// plugged in behind the same trait.
pub struct WavFileSource {
    path: PathBuf,
    frame_duration: Duration,
    realtime: bool,
    feeder: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn new(path: impl Into<PathBuf>, realtime: bool) -> Self {
        Self {
            path: path.into(),
            frame_duration: Duration::from_millis(100),
            realtime,
            feeder: None,
        }
    }

    fn load(path: &Path) -> Result<(Vec<i16>, u32, u16)> {
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        Ok((samples, spec.sample_rate, spec.channels))
    }
}

#[async_trait]
impl AudioSource for WavFileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (samples, sample_rate, channels) = Self::load(&self.path)?;

        let duration_secs =
            samples.len() as f64 / (sample_rate as f64 * channels as f64);
        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels",
            duration_secs, sample_rate, channels
        );

        let samples_per_frame =
            (sample_rate as u64 * self.frame_duration.as_millis() as u64 / 1000) as usize
                * channels as usize;
        let pace = self.realtime.then_some(self.frame_duration);

        let (tx, rx) = mpsc::channel(32);
        let feeder = tokio::spawn(async move {
            for chunk in samples.chunks(samples_per_frame.max(1)) {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                };
                if tx.send(frame).await.is_err() {
                    break; // coordinator dropped the receiver
                }
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
            }
            // Dropping tx closes the channel and signals end-of-stream
        });

        self.feeder = Some(feeder);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test_wav(path: &Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[tokio::test]
    async fn test_replay_delivers_all_samples() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.wav");
        write_test_wav(&path, &vec![100i16; 4800]);

        let mut source = WavFileSource::new(&path, false);
        let mut rx = source.start().await.unwrap();

        let mut total = 0;
        while let Some(frame) = rx.recv().await {
            assert_eq!(frame.sample_rate, 16000);
            assert_eq!(frame.channels, 1);
            total += frame.samples.len();
        }
        assert_eq!(total, 4800);

        source.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let mut source = WavFileSource::new("/nonexistent/audio.wav", false);
        assert!(source.start().await.is_err());
    }
}
