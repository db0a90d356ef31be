//! OpenAI Whisper transcription implementation.

use super::Transcriber;
use crate::audio::split_audio;
use crate::config::TranscriptionSettings;
use crate::error::{Result, SkrivError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
///
/// Whisper rejects uploads over 25 MB, so long audio is split into chunks
/// that are transcribed concurrently and joined in playback order.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    /// Create a transcriber from the `[transcription]` settings.
    pub fn with_config(settings: &TranscriptionSettings) -> Result<Self> {
        let client =
            create_client_with_timeout(Duration::from_secs(settings.request_timeout_seconds))?;

        Ok(Self {
            client,
            model: settings.model.clone(),
            chunk_duration_seconds: settings.chunk_duration_seconds,
            max_concurrent_chunks: settings.max_concurrent_chunks,
        })
    }

    /// Transcribe one file in a single request.
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe_single(&self, audio_path: &Path, language: &str) -> Result<String> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .language(language)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| SkrivError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| SkrivError::OpenAI(format!("Whisper API error: {}", e)))?;

        let text = response.text.trim().to_string();
        debug!("Transcribed {} characters", text.chars().count());
        Ok(text)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String> {
        let parent = audio_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let chunk_dir = tempfile::Builder::new().prefix("chunks-").tempdir_in(parent)?;

        let chunks = split_audio(audio_path, chunk_dir.path(), self.chunk_duration_seconds).await?;
        if chunks.len() == 1 {
            return self.transcribe_single(audio_path, language).await;
        }

        info!("Transcribing {} audio chunks with {}", chunks.len(), self.model);

        let paths = chunks.into_iter().map(|(path, _)| path).collect();
        transcribe_in_order(paths, self.max_concurrent_chunks, |path| async move {
            self.transcribe_single(&path, language).await
        })
        .await
    }
}

/// Run `transcribe` over `chunks` with at most `concurrency` in flight.
///
/// Texts are joined in chunk order whatever order they finish in. The first
/// failure aborts the rest.
pub(crate) async fn transcribe_in_order<F, Fut>(
    chunks: Vec<PathBuf>,
    concurrency: usize,
    transcribe: F,
) -> Result<String>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut results: Vec<(usize, String)> = Vec::with_capacity(chunks.len());

    let mut stream = stream::iter(chunks.into_iter().enumerate())
        .map(|(idx, path)| {
            let pending = transcribe(path);
            async move { (idx, pending.await) }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((idx, result)) = stream.next().await {
        match result {
            Ok(text) => results.push((idx, text)),
            Err(e) => {
                return Err(SkrivError::Transcription(format!("Chunk {} failed: {}", idx, e)));
            }
        }
    }

    results.sort_by_key(|(idx, _)| *idx);

    Ok(results
        .into_iter()
        .map(|(_, text)| text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" "))
}
