//! Configuration for lectern paths and pipeline defaults.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LECTERN_HOME)
//! 2. Config file ($LECTERN_HOME/config.yaml)
//! 3. Defaults (~/.lectern, Korean language hint, stock endpoints)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::clients::{notesink, summarization, transcription};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Language hint forwarded to the transcription endpoint
    pub language: Option<String>,
    pub transcription_endpoint: Option<String>,
    pub transcription_model: Option<String>,
    pub summarization_endpoint: Option<String>,
    pub summarization_model: Option<String>,
    pub note_sink_base_url: Option<String>,
}

/// Resolved configuration with every field populated
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to lectern home (store and config live here)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub language: String,
    pub transcription_endpoint: String,
    pub transcription_model: String,
    pub summarization_endpoint: String,
    pub summarization_model: String,
    pub note_sink_base_url: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            transcription_endpoint: transcription::DEFAULT_ENDPOINT.to_string(),
            transcription_model: transcription::DEFAULT_MODEL.to_string(),
            summarization_endpoint: summarization::DEFAULT_ENDPOINT.to_string(),
            summarization_model: summarization::DEFAULT_MODEL.to_string(),
            note_sink_base_url: notesink::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl PipelineSettings {
    fn from_file(file: PipelineConfig) -> Self {
        let defaults = Self::default();
        Self {
            language: file.language.unwrap_or(defaults.language),
            transcription_endpoint: file
                .transcription_endpoint
                .unwrap_or(defaults.transcription_endpoint),
            transcription_model: file
                .transcription_model
                .unwrap_or(defaults.transcription_model),
            summarization_endpoint: file
                .summarization_endpoint
                .unwrap_or(defaults.summarization_endpoint),
            summarization_model: file
                .summarization_model
                .unwrap_or(defaults.summarization_model),
            note_sink_base_url: file.note_sink_base_url.unwrap_or(defaults.note_sink_base_url),
        }
    }
}

/// Load and parse a config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let home = if let Ok(env_home) = std::env::var("LECTERN_HOME") {
        PathBuf::from(env_home)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".lectern")
    };

    let config_path = home.join("config.yaml");
    let (config_file, pipeline) = if config_path.exists() {
        let file = load_config_file(&config_path)?;
        (Some(config_path), PipelineSettings::from_file(file.pipeline))
    } else {
        (None, PipelineSettings::default())
    };

    Ok(ResolvedConfig {
        home,
        config_file,
        pipeline,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the lectern home directory
pub fn lectern_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the store path ($LECTERN_HOME/store.json)
pub fn store_path() -> Result<PathBuf> {
    Ok(config()?.home.join("store.json"))
}
