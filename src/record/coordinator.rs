//! The recording coordinator: `Idle → Recording → Idle`.
//!
//! While recording, the coordinator drains the audio source into a segment
//! buffer and rotates the buffer on a fixed interval. Each closed segment
//! above the silence threshold is handed to a spawned pipeline task;
//! pipeline failures never stop subsequent capture. Stopping flushes the
//! in-progress segment through the same pipeline before the coordinator
//! returns to idle, while earlier in-flight pipelines run to completion on
//! their own.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clients::PipelineError;

use super::audio::AudioSource;
use super::pipeline::{run_segment_task, PipelineDeps};
use super::segment::SegmentBuffer;

/// Fixed segment rotation interval
pub const SEGMENT_DURATION: Duration = Duration::from_secs(5);

/// Encoded segments below this size are treated as silence and discarded
/// without touching any remote service
pub const MIN_SEGMENT_BYTES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Recording,
}

pub struct Coordinator {
    deps: Arc<PipelineDeps>,
    segment_duration: Duration,
    state: CoordinatorState,
    capture_task: Option<JoinHandle<()>>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl Coordinator {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            deps: Arc::new(deps),
            segment_duration: SEGMENT_DURATION,
            state: CoordinatorState::Idle,
            capture_task: None,
            stop_tx: None,
        }
    }

    /// Override the rotation interval (tests use short intervals)
    pub fn with_segment_duration(mut self, duration: Duration) -> Self {
        self.segment_duration = duration;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Start a new recording session.
    ///
    /// Requires a transcription credential; without one this fails before
    /// touching the audio source and the coordinator stays idle. Starting
    /// clears the previous session and its cached container id.
    pub async fn start(&mut self, mut source: Box<dyn AudioSource>, title: &str) -> Result<()> {
        if self.state == CoordinatorState::Recording {
            warn!("Recording already started");
            return Ok(());
        }

        let credentials = self.deps.store.credentials().await?;
        if !credentials.has_transcription_key() {
            return Err(PipelineError::Configuration("transcription").into());
        }

        let session = crate::domain::Session::new(title);
        info!(session_id = %session.id, title, source = source.name(), "Starting recording session");
        self.deps.store.set_session(&session).await?;
        self.deps
            .store
            .set_remote_config(&crate::domain::RemoteConfig::default())
            .await?;

        let mut frames = source.start().await?;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let deps = Arc::clone(&self.deps);
        let segment_duration = self.segment_duration;

        let capture_task = tokio::spawn(async move {
            let mut buffer = SegmentBuffer::new();
            let mut pipelines: JoinSet<()> = JoinSet::new();

            // interval_at so the first tick fires after one full interval
            let first_tick = tokio::time::Instant::now() + segment_duration;
            let mut ticker = tokio::time::interval_at(first_tick, segment_duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    frame = frames.recv() => match frame {
                        Some(frame) => buffer.push(&frame),
                        None => break, // source drained
                    },
                    _ = ticker.tick() => {
                        spawn_segment(&deps, &mut buffer, &mut pipelines);
                    }
                    _ = stop_rx.changed() => break,
                }

                // Reap finished pipelines so the in-flight set stays bounded
                while pipelines.try_join_next().is_some() {}
            }

            // Flush the in-progress segment through the same pipeline
            match buffer.rotate() {
                Ok(Some(segment)) if segment.wav.len() >= MIN_SEGMENT_BYTES => {
                    debug!(index = segment.index, bytes = segment.wav.len(), "Flushing final segment");
                    run_segment_task(Arc::clone(&deps), segment).await;
                }
                Ok(Some(segment)) => {
                    debug!(bytes = segment.wav.len(), "Final segment below silence threshold, discarded");
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "Failed to encode final segment"),
            }

            if let Err(e) = source.stop().await {
                warn!(error = %e, "Failed to stop audio source");
            }

            // Earlier in-flight pipelines run to completion independently
            pipelines.detach_all();
        });

        self.capture_task = Some(capture_task);
        self.stop_tx = Some(stop_tx);
        self.state = CoordinatorState::Recording;

        Ok(())
    }

    /// Stop recording: halt new capture, wait for the final-segment flush,
    /// and mark the session stopped
    pub async fn stop(&mut self) -> Result<()> {
        if self.state != CoordinatorState::Recording {
            warn!("Recording not active");
            return Ok(());
        }

        info!("Stopping recording session");

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }

        if let Some(task) = self.capture_task.take() {
            if let Err(e) = task.await {
                error!("Capture task panicked: {}", e);
            }
        }

        self.finish_session().await
    }

    /// Wait for the capture task to finish on its own (source drained),
    /// then finalize the session. Used with batch replay sources.
    pub async fn run_to_completion(&mut self) -> Result<()> {
        if self.state != CoordinatorState::Recording {
            return Ok(());
        }

        if let Some(task) = self.capture_task.as_mut() {
            if let Err(e) = task.await {
                error!("Capture task panicked: {}", e);
            }
        }
        self.capture_task = None;
        self.stop_tx = None;

        self.finish_session().await
    }

    async fn finish_session(&mut self) -> Result<()> {
        self.state = CoordinatorState::Idle;

        if let Some(mut session) = self.deps.store.session().await? {
            session.recording = false;
            self.deps.store.set_session(&session).await?;
        }

        info!("Recording session stopped");
        Ok(())
    }
}

/// Rotate the buffer and hand the closed segment to a pipeline task,
/// discarding segments below the silence threshold
fn spawn_segment(
    deps: &Arc<PipelineDeps>,
    buffer: &mut SegmentBuffer,
    pipelines: &mut JoinSet<()>,
) {
    match buffer.rotate() {
        Ok(Some(segment)) => {
            if segment.wav.len() < MIN_SEGMENT_BYTES {
                debug!(
                    index = segment.index,
                    bytes = segment.wav.len(),
                    "Segment below silence threshold, discarded"
                );
                return;
            }
            debug!(index = segment.index, bytes = segment.wav.len(), "Segment closed");
            pipelines.spawn(run_segment_task(Arc::clone(deps), segment));
        }
        Ok(None) => {}
        Err(e) => error!(error = %e, "Failed to encode segment"),
    }
}
