//! Command-line interface for lectern.
//!
//! The `record` command is also the presenter: it subscribes to the event
//! bus, prints notes as they arrive (newest first), and persists the
//! rendered snapshot so `notes` can recover the view after a restart.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::bus::{BroadcastBus, UiEvent};
use crate::clients::{ChatSummarizer, NotionSink, WhisperClient};
use crate::domain::Note;
use crate::record::{Coordinator, CoordinatorState, PipelineDeps, WavFileSource};
use crate::store::{JsonFileStore, StoreHandle};

/// lectern - lecture-audio capture pipeline
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from an audio source and run the note pipeline
    Record {
        /// WAV file replayed as the capture source
        #[arg(short, long)]
        input: PathBuf,

        /// Lecture title, also used for the remote container
        #[arg(short, long, default_value = "강의 노트")]
        title: String,

        /// Replay the file in real time instead of as fast as possible
        #[arg(long)]
        realtime: bool,
    },

    /// Show the current session state
    Status,

    /// Print stored notes, newest first
    Notes,

    /// Save API credentials into the local store
    Configure {
        /// Speech-to-text API key
        #[arg(long, env = "LECTERN_TRANSCRIPTION_KEY")]
        transcription_key: Option<String>,

        /// Language-model API key
        #[arg(long, env = "LECTERN_SUMMARIZATION_KEY")]
        summarization_key: Option<String>,

        /// Note-sink integration token
        #[arg(long, env = "LECTERN_NOTE_SINK_TOKEN")]
        note_sink_token: Option<String>,

        /// Parent page or database id for note containers
        #[arg(long)]
        note_sink_parent: Option<String>,

        /// Update the current session title
        #[arg(long)]
        title: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Record {
                input,
                title,
                realtime,
            } => record(input, title, realtime).await,
            Commands::Status => status().await,
            Commands::Notes => notes().await,
            Commands::Configure {
                transcription_key,
                summarization_key,
                note_sink_token,
                note_sink_parent,
                title,
            } => {
                configure(
                    transcription_key,
                    summarization_key,
                    note_sink_token,
                    note_sink_parent,
                    title,
                )
                .await
            }
            Commands::Config => show_config(),
        }
    }
}

async fn open_store() -> Result<StoreHandle> {
    Ok(StoreHandle::new(Arc::new(
        JsonFileStore::open_default().await?,
    )))
}

async fn record(input: PathBuf, title: String, realtime: bool) -> Result<()> {
    let settings = &crate::config::config()?.pipeline;
    let store = open_store().await?;

    let bus = BroadcastBus::new(64);
    let events = bus.subscribe();

    let deps = PipelineDeps {
        store: store.clone(),
        bus: bus.clone(),
        transcriber: Arc::new(WhisperClient::with_endpoint(
            &settings.transcription_endpoint,
            &settings.transcription_model,
        )),
        summarizer: Arc::new(ChatSummarizer::with_endpoint(
            &settings.summarization_endpoint,
            &settings.summarization_model,
        )),
        sink: Arc::new(NotionSink::with_base_url(&settings.note_sink_base_url)),
        language: settings.language.clone(),
    };

    let presenter = tokio::spawn(presenter_loop(store.clone(), events));

    let mut coordinator = Coordinator::new(deps);
    let source = WavFileSource::new(&input, realtime);
    coordinator.start(Box::new(source), &title).await?;

    println!("● Recording... (Ctrl-C to stop)");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
        }
        result = coordinator.run_to_completion() => {
            result?;
        }
    }

    if coordinator.state() == CoordinatorState::Recording {
        coordinator.stop().await?;
    }

    // Give late pipeline events a moment to reach the presenter
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    presenter.abort();

    if let Some(session) = store.session().await? {
        let saved = session.notes.iter().filter(|n| n.saved_remotely).count();
        println!(
            "Session '{}' finished: {} notes ({} saved remotely)",
            session.title,
            session.notes.len(),
            saved
        );
    }

    Ok(())
}

/// Render incoming events until the bus closes
async fn presenter_loop(store: StoreHandle, mut events: broadcast::Receiver<UiEvent>) {
    // A new session starts with a cleared view
    let mut rendered = String::new();

    loop {
        match events.recv().await {
            Ok(UiEvent::NewNote { note }) => {
                let block = render_note(&note);
                println!("{}", block);

                // Newest first, matching the notes view
                rendered = if rendered.is_empty() {
                    block
                } else {
                    format!("{}\n{}", block, rendered)
                };
                if let Err(e) = store.set_rendered_notes(&rendered).await {
                    warn!(error = %e, "Failed to persist rendered notes");
                }
            }
            Ok(UiEvent::NoteSaved { timestamp }) => {
                println!("  ✅ {} saved to remote container", timestamp);
            }
            Ok(UiEvent::Error { message }) => {
                eprintln!("  ❌ {}", message);
            }
            Ok(UiEvent::SinkError { message }) => {
                // Non-fatal: the note is still available locally
                warn!("Remote save failed: {}", message);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Presenter fell behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Format one note for the terminal
pub fn render_note(note: &Note) -> String {
    let mut out = format!("⏰ {}\n", note.timestamp);
    for line in note.summary_lines() {
        out.push_str("  • ");
        out.push_str(line);
        out.push('\n');
    }
    if !note.keywords.is_empty() {
        out.push_str(&format!("  🏷️ 키워드: {}\n", note.keywords.join(", ")));
    }
    out.push_str("────────────────────");
    out
}

async fn status() -> Result<()> {
    let store = open_store().await?;

    match store.session().await? {
        Some(session) => {
            let saved = session.notes.iter().filter(|n| n.saved_remotely).count();
            println!("Session:   {}", session.title);
            println!("Recording: {}", if session.recording { "yes" } else { "no" });
            println!("Started:   {}", session.started_at.to_rfc3339());
            println!("Notes:     {} ({} saved remotely)", session.notes.len(), saved);
        }
        None => println!("No session recorded yet"),
    }

    Ok(())
}

async fn notes() -> Result<()> {
    let store = open_store().await?;

    if let Some(session) = store.session().await? {
        if !session.notes.is_empty() {
            for note in session.notes.iter().rev() {
                println!("{}", render_note(note));
            }
            return Ok(());
        }
    }

    // Fall back to the last rendered snapshot (restart recovery)
    match store.rendered_notes().await? {
        Some(rendered) if !rendered.is_empty() => println!("{}", rendered),
        _ => println!("No notes yet"),
    }

    Ok(())
}

async fn configure(
    transcription_key: Option<String>,
    summarization_key: Option<String>,
    note_sink_token: Option<String>,
    note_sink_parent: Option<String>,
    title: Option<String>,
) -> Result<()> {
    let store = open_store().await?;

    // Re-read and overlay so unspecified fields survive
    let mut credentials = store.credentials().await?;
    if let Some(key) = transcription_key {
        credentials.transcription_key = key;
    }
    if let Some(key) = summarization_key {
        credentials.summarization_key = key;
    }
    if let Some(token) = note_sink_token {
        credentials.note_sink_token = token;
    }
    if let Some(parent) = note_sink_parent {
        credentials.note_sink_parent_id = parent;
    }

    if !credentials.has_transcription_key() {
        anyhow::bail!("A transcription key is required; pass --transcription-key");
    }

    store.set_credentials(&credentials).await?;
    println!("Credentials saved");

    if let Some(title) = title {
        if let Some(mut session) = store.session().await? {
            session.title = title;
            store.set_session(&session).await?;
            println!("Session title updated");
        }
    }

    Ok(())
}

fn show_config() -> Result<()> {
    let config = crate::config::config().context("Failed to resolve configuration")?;

    println!("home:       {}", config.home.display());
    match &config.config_file {
        Some(path) => println!("config:     {}", path.display()),
        None => println!("config:     (defaults)"),
    }
    println!("language:   {}", config.pipeline.language);
    println!(
        "transcribe: {} ({})",
        config.pipeline.transcription_endpoint, config.pipeline.transcription_model
    );
    println!(
        "summarize:  {} ({})",
        config.pipeline.summarization_endpoint, config.pipeline.summarization_model
    );
    println!("note sink:  {}", config.pipeline.note_sink_base_url);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_note_strips_bullets_and_lists_keywords() {
        let mut note = Note::new(
            "원문".to_string(),
            "• 첫 번째\n- 두 번째".to_string(),
            vec!["AI".to_string(), "기술".to_string()],
        );
        note.timestamp = "14:30:00".to_string();

        let rendered = render_note(&note);
        assert!(rendered.starts_with("⏰ 14:30:00"));
        assert!(rendered.contains("  • 첫 번째"));
        assert!(rendered.contains("  • 두 번째"));
        assert!(rendered.contains("키워드: AI, 기술"));
    }

    #[test]
    fn test_render_note_without_keywords_omits_tag_line() {
        let note = Note::new("t".to_string(), "• only".to_string(), vec![]);
        assert!(!render_note(&note).contains("키워드"));
    }
}
