//! Audio capture, segmentation, and the per-segment pipeline.

pub mod audio;
pub mod coordinator;
pub mod pipeline;
pub mod segment;

pub use audio::{AudioFrame, AudioSource, WavFileSource};
pub use coordinator::{Coordinator, CoordinatorState, MIN_SEGMENT_BYTES, SEGMENT_DURATION};
pub use pipeline::{process_segment, run_segment_task, PipelineDeps, MIN_TRANSCRIPT_CHARS};
pub use segment::{Segment, SegmentBuffer};
