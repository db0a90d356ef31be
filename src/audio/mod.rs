//! Media fetching for Skriv.
//!
//! [`MediaFetcher`] turns a URL and a [`TimeRange`] into a trimmed local audio
//! file. [`YtDlpFetcher`] does it with yt-dlp, ffmpeg and ffprobe.

mod downloader;

pub use downloader::{download_audio, probe_duration, split_audio, trim_audio, validate_url};

use crate::error::Result;
use crate::timecode::TimeRange;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the trimmed file handed to the user and the transcriber.
const TRIMMED_FILE_NAME: &str = "audio.mp3";

/// A trimmed audio file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// Source of trimmed audio for a media URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url`, cut it to `range` and write the result inside `workdir`.
    async fn fetch(&self, url: &str, range: &TimeRange, workdir: &Path) -> Result<AudioArtifact>;
}

/// Fetcher backed by the yt-dlp and ffmpeg command line tools.
#[derive(Debug, Default, Clone)]
pub struct YtDlpFetcher;

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, range: &TimeRange, workdir: &Path) -> Result<AudioArtifact> {
        let source = download_audio(url, workdir).await?;

        let trimmed = workdir.join(TRIMMED_FILE_NAME);
        trim_audio(&source, &trimmed, range).await?;

        let duration_seconds = probe_duration(&trimmed).await?;
        info!("Trimmed audio is {:.1}s long", duration_seconds);

        // Only the trimmed copy is needed from here on.
        let _ = std::fs::remove_file(&source);

        Ok(AudioArtifact {
            path: trimmed,
            duration_seconds,
        })
    }
}
