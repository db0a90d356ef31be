//! Pipeline orchestrator for Skriv.
//!
//! Coordinates fetching, trimming and transcribing a media URL. The bot's job
//! runner drives the steps one by one; the HTTP API and the CLI use
//! [`Orchestrator::transcribe_url`].

use crate::audio::{AudioArtifact, MediaFetcher, YtDlpFetcher};
use crate::config::Settings;
use crate::error::Result;
use crate::timecode::TimeRange;
use crate::transcription::{Transcriber, WhisperTranscriber};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, instrument};

/// The main orchestrator for the Skriv pipeline.
pub struct Orchestrator {
    fetcher: Arc<dyn MediaFetcher>,
    transcriber: Arc<dyn Transcriber>,
    temp_dir: PathBuf,
    language: String,
    cost_per_minute: f64,
}

impl Orchestrator {
    /// Create an orchestrator backed by yt-dlp and OpenAI Whisper.
    pub fn new(settings: &Settings) -> Result<Self> {
        let transcriber = WhisperTranscriber::with_config(&settings.transcription)?;

        info!(
            "Using {} for transcription (language: {})",
            settings.transcription.model, settings.transcription.language
        );

        Self::with_components(settings, Arc::new(YtDlpFetcher::new()), Arc::new(transcriber))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        fetcher: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<Self> {
        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            fetcher,
            transcriber,
            temp_dir,
            language: settings.transcription.language.clone(),
            cost_per_minute: settings.transcription.cost_per_minute,
        })
    }

    /// Create a scratch directory for one job. It is removed when dropped.
    pub fn workdir(&self) -> Result<TempDir> {
        Ok(tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.temp_dir)?)
    }

    /// Download and trim the audio behind `url`.
    #[instrument(skip(self, workdir))]
    pub async fn fetch_audio(&self, url: &str, range: &TimeRange, workdir: &Path) -> Result<AudioArtifact> {
        self.fetcher.fetch(url, range, workdir).await
    }

    /// Transcribe a fetched artifact in the configured language.
    #[instrument(skip(self), fields(path = %artifact.path.display()))]
    pub async fn transcribe(&self, artifact: &AudioArtifact) -> Result<String> {
        self.transcriber.transcribe(&artifact.path, &self.language).await
    }

    /// Estimated API cost in USD for `duration_seconds` of audio.
    pub fn estimate_cost(&self, duration_seconds: f64) -> f64 {
        duration_seconds / 60.0 * self.cost_per_minute
    }

    /// Run the whole pipeline for a URL and return the transcript.
    #[instrument(skip(self))]
    pub async fn transcribe_url(&self, url: &str, range: &TimeRange) -> Result<TranscriptionResult> {
        let workdir = self.workdir()?;

        let artifact = self.fetch_audio(url, range, workdir.path()).await?;
        let transcript = self.transcribe(&artifact).await?;
        let cost = self.estimate_cost(artifact.duration_seconds);

        info!(
            "Transcribed {:.1}s of audio, estimated cost ${:.4}",
            artifact.duration_seconds, cost
        );

        Ok(TranscriptionResult {
            transcript,
            duration_seconds: artifact.duration_seconds,
            cost,
        })
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Transcript text.
    pub transcript: String,
    /// Length of the trimmed audio in seconds.
    pub duration_seconds: f64,
    /// Estimated API cost in USD.
    pub cost: f64,
}
