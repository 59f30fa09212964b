//! lectern - lecture-audio capture pipeline
//!
//! Records an audio stream in fixed-duration segments and runs each segment
//! through a three-stage remote pipeline: speech-to-text, summarization, and
//! a note-sink append. Every note is persisted locally before any remote save
//! is attempted; remote failures never roll back local state.
//!
//! # Architecture
//!
//! - `record`: the `Coordinator` state machine (`Idle → Recording → Idle`),
//!   segment rotation, and the per-segment pipeline tasks
//! - `clients`: remote API clients (transcription, summarization, note sink)
//!   behind async traits so the pipeline is testable offline
//! - `store`: a named-JSON-blob key-value store (file-backed and in-memory)
//! - `bus`: best-effort in-process event bus feeding any attached presenter
//! - `domain`: data structures (Session, Note, Credentials)
//! - `cli`: command-line interface and the terminal note presenter
//!
//! # Usage
//!
//! ```bash
//! # Store credentials
//! lectern configure --transcription-key sk-...
//!
//! # Replay a lecture recording through the pipeline
//! lectern record --input lecture.wav --title "분산 시스템 3강"
//!
//! # Inspect the session and its notes
//! lectern status
//! lectern notes
//! ```

pub mod bus;
pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod record;
pub mod store;

// Re-export main types at crate root for convenience
pub use bus::{BroadcastBus, EventBus, UiEvent};
pub use clients::{
    parse_note_body, ChatSummarizer, NoteBody, NoteSink, NotionSink, PipelineError, Summarize,
    Transcribe, WhisperClient,
};
pub use domain::{Credentials, Note, RemoteConfig, Session};
pub use record::{
    AudioFrame, AudioSource, Coordinator, CoordinatorState, PipelineDeps, Segment, SegmentBuffer,
    WavFileSource, MIN_SEGMENT_BYTES, SEGMENT_DURATION,
};
pub use store::{JsonFileStore, MemoryStore, Store, StoreHandle};
