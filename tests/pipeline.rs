//! Segment Pipeline Integration Tests
//!
//! Exercises the transcribe → summarize → persist → remote-save chain with
//! fake clients and an in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use lectern::bus::{EventBus, UiEvent};
use lectern::clients::{
    parse_note_body, NoteBody, NoteSink, PipelineError, Summarize, Transcribe,
};
use lectern::domain::{Credentials, Note, Session};
use lectern::record::{process_segment, run_segment_task, PipelineDeps, Segment};
use lectern::store::{MemoryStore, StoreHandle};

const LONG_TRANSCRIPT: &str = "오늘 강의에서는 분산 시스템의 합의 알고리즘을 다룹니다";

struct RecordingBus {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingBus {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct FixedTranscriber {
    text: String,
    calls: AtomicUsize,
}

impl FixedTranscriber {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcribe for FixedTranscriber {
    async fn transcribe(
        &self,
        _credentials: &Credentials,
        _audio_wav: &[u8],
        _language: &str,
    ) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

struct FixedSummarizer {
    response: String,
    calls: AtomicUsize,
}

impl FixedSummarizer {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Summarize for FixedSummarizer {
    async fn summarize(
        &self,
        _credentials: &Credentials,
        _transcript: &str,
    ) -> Result<NoteBody, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(parse_note_body(&self.response))
    }
}

struct MockSink {
    creates: AtomicUsize,
    appends: AtomicUsize,
    fail_append: bool,
}

impl MockSink {
    fn new(fail_append: bool) -> Arc<Self> {
        Arc::new(Self {
            creates: AtomicUsize::new(0),
            appends: AtomicUsize::new(0),
            fail_append,
        })
    }
}

#[async_trait]
impl NoteSink for MockSink {
    async fn create_container(
        &self,
        _credentials: &Credentials,
        _title: &str,
    ) -> Result<String, PipelineError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok("container-1".to_string())
    }

    async fn append_content(
        &self,
        _credentials: &Credentials,
        _container_id: &str,
        _note: &Note,
    ) -> Result<(), PipelineError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail_append {
            Err(PipelineError::Upstream {
                status: 404,
                message: "integration lacks access to the parent page".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn segment(index: usize) -> Segment {
    Segment {
        index,
        captured_at: Utc::now(),
        wav: vec![0u8; 2000],
    }
}

fn full_credentials() -> Credentials {
    Credentials {
        transcription_key: "sk-stt".to_string(),
        summarization_key: "sk-llm".to_string(),
        note_sink_token: "secret".to_string(),
        note_sink_parent_id: "parentdb".to_string(),
    }
}

async fn seeded_store(credentials: Credentials) -> StoreHandle {
    let store = StoreHandle::new(Arc::new(MemoryStore::new()));
    store.set_credentials(&credentials).await.unwrap();
    store.set_session(&Session::new("테스트 강의")).await.unwrap();
    store
}

struct Fixture {
    deps: PipelineDeps,
    store: StoreHandle,
    bus: Arc<RecordingBus>,
    transcriber: Arc<FixedTranscriber>,
    summarizer: Arc<FixedSummarizer>,
    sink: Arc<MockSink>,
}

async fn fixture(
    credentials: Credentials,
    transcript: &str,
    summary_response: &str,
    fail_append: bool,
) -> Fixture {
    let store = seeded_store(credentials).await;
    let bus = RecordingBus::new();
    let transcriber = FixedTranscriber::new(transcript);
    let summarizer = FixedSummarizer::new(summary_response);
    let sink = MockSink::new(fail_append);

    let deps = PipelineDeps {
        store: store.clone(),
        bus: bus.clone(),
        transcriber: transcriber.clone(),
        summarizer: summarizer.clone(),
        sink: sink.clone(),
        language: "ko".to_string(),
    };

    Fixture {
        deps,
        store,
        bus,
        transcriber,
        summarizer,
        sink,
    }
}

#[tokio::test]
async fn test_short_transcript_skips_summarization() {
    // 5 characters, well under the threshold
    let f = fixture(full_credentials(), "짧은 내용", "unused", false).await;

    let result = process_segment(&f.deps, segment(0)).await.unwrap();

    assert!(result.is_none());
    assert_eq!(f.transcriber.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.summarizer.calls.load(Ordering::SeqCst), 0);

    // No note was created or announced
    let session = f.store.session().await.unwrap().unwrap();
    assert!(session.notes.is_empty());
    assert!(f.bus.events().is_empty());
}

#[tokio::test]
async fn test_structured_response_becomes_note() {
    let f = fixture(
        full_credentials(),
        LONG_TRANSCRIPT,
        "• A\n• B\n\n키워드: x, y",
        false,
    )
    .await;

    let note = process_segment(&f.deps, segment(0)).await.unwrap().unwrap();

    assert_eq!(note.summary, "• A\n• B");
    assert_eq!(note.keywords, vec!["x", "y"]);
    assert_eq!(note.original_text, LONG_TRANSCRIPT);

    let session = f.store.session().await.unwrap().unwrap();
    assert_eq!(session.notes.len(), 1);
}

#[tokio::test]
async fn test_note_survives_sink_failure() {
    let f = fixture(
        full_credentials(),
        LONG_TRANSCRIPT,
        "• A\n\n키워드: x",
        true,
    )
    .await;

    let note = process_segment(&f.deps, segment(0)).await.unwrap().unwrap();

    // Locally persisted, never rolled back
    let session = f.store.session().await.unwrap().unwrap();
    assert_eq!(session.notes.len(), 1);
    assert!(!session.notes[0].saved_remotely);

    let events = f.bus.events();
    assert!(matches!(&events[0], UiEvent::NewNote { note: n } if n.timestamp == note.timestamp));
    assert!(events
        .iter()
        .any(|e| matches!(e, UiEvent::SinkError { .. })));
    assert!(!events.iter().any(|e| matches!(e, UiEvent::NoteSaved { .. })));
}

#[tokio::test]
async fn test_container_created_once_per_session() {
    let f = fixture(
        full_credentials(),
        LONG_TRANSCRIPT,
        "• A\n\n키워드: x",
        false,
    )
    .await;

    process_segment(&f.deps, segment(0)).await.unwrap();
    process_segment(&f.deps, segment(1)).await.unwrap();

    assert_eq!(f.sink.creates.load(Ordering::SeqCst), 1);
    assert_eq!(f.sink.appends.load(Ordering::SeqCst), 2);

    // The id is cached for the rest of the session
    let remote = f.store.remote_config().await.unwrap();
    assert_eq!(remote.container_id.as_deref(), Some("container-1"));
}

#[tokio::test]
async fn test_sink_success_marks_note_saved_in_store() {
    let f = fixture(
        full_credentials(),
        LONG_TRANSCRIPT,
        "• A\n\n키워드: x",
        false,
    )
    .await;

    let note = process_segment(&f.deps, segment(0)).await.unwrap().unwrap();

    // The store carries the saved flag; the bus event is advisory only, so
    // a presenter that missed it still sees the note as saved on reload
    let session = f.store.session().await.unwrap().unwrap();
    assert!(session.notes[0].saved_remotely);
    assert!(f
        .bus
        .events()
        .iter()
        .any(|e| matches!(e, UiEvent::NoteSaved { timestamp } if *timestamp == note.timestamp)));
}

#[tokio::test]
async fn test_unconfigured_sink_keeps_note_local() {
    let credentials = Credentials {
        transcription_key: "sk-stt".to_string(),
        summarization_key: "sk-llm".to_string(),
        ..Default::default()
    };
    let f = fixture(credentials, LONG_TRANSCRIPT, "• A\n\n키워드: x", false).await;

    process_segment(&f.deps, segment(0)).await.unwrap();

    assert_eq!(f.sink.creates.load(Ordering::SeqCst), 0);
    assert_eq!(f.sink.appends.load(Ordering::SeqCst), 0);

    let session = f.store.session().await.unwrap().unwrap();
    assert_eq!(session.notes.len(), 1);
    assert!(!session.notes[0].saved_remotely);

    // Not an error: the sink is simply not configured
    assert!(!f
        .bus
        .events()
        .iter()
        .any(|e| matches!(e, UiEvent::SinkError { .. } | UiEvent::Error { .. })));
}

#[tokio::test]
async fn test_transcription_failure_stays_inside_error_boundary() {
    struct FailingTranscriber;

    #[async_trait]
    impl Transcribe for FailingTranscriber {
        async fn transcribe(
            &self,
            _credentials: &Credentials,
            _audio_wav: &[u8],
            _language: &str,
        ) -> Result<String, PipelineError> {
            Err(PipelineError::Upstream {
                status: 500,
                message: "stt backend down".to_string(),
            })
        }
    }

    let store = seeded_store(full_credentials()).await;
    let bus = RecordingBus::new();
    let deps = Arc::new(PipelineDeps {
        store: store.clone(),
        bus: bus.clone(),
        transcriber: Arc::new(FailingTranscriber),
        summarizer: FixedSummarizer::new("unused"),
        sink: MockSink::new(false),
        language: "ko".to_string(),
    });

    // The task entry point swallows the error and reports it on the bus
    run_segment_task(deps, segment(0)).await;

    let events = bus.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], UiEvent::Error { message } if message.contains("stt backend down")));

    let session = store.session().await.unwrap().unwrap();
    assert!(session.notes.is_empty());
}
