//! Audio download and processing utilities.
//!
//! This module downloads audio from URLs using yt-dlp, trims it with ffmpeg
//! and measures the result with ffprobe.

use crate::error::{Result, SkrivError};
use crate::timecode::TimeRange;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// File stem yt-dlp writes the untouched download to.
const SOURCE_STEM: &str = "source";

/// Reject anything that is not an absolute http(s) URL before handing it to yt-dlp.
pub fn validate_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| SkrivError::InvalidInput(format!("Not a valid URL '{}': {}", raw.trim(), e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(SkrivError::InvalidInput(format!(
            "Unsupported URL scheme '{}', expected http or https",
            other
        ))),
    }
}

/// Downloads the best available audio stream of `url` into `output_dir`.
///
/// The file keeps whatever container yt-dlp picks; trimming re-encodes it.
#[instrument(skip(output_dir))]
pub async fn download_audio(url: &str, output_dir: &Path) -> Result<PathBuf> {
    let url = validate_url(url)?;
    std::fs::create_dir_all(output_dir)?;

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", SOURCE_STEM));

    let result = Command::new("yt-dlp")
        .arg("--format").arg("bestaudio/best")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--no-exec")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url.as_str())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SkrivError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(SkrivError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SkrivError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    find_audio_file(output_dir, SOURCE_STEM)
}

/// Locates a downloaded file by stem, whatever extension it ended up with.
fn find_audio_file(dir: &Path, stem: &str) -> Result<PathBuf> {
    for ext in &["webm", "m4a", "opus", "mp3", "ogg", "mp4"] {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| SkrivError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(stem) && !name.ends_with(".part") {
            return Ok(entry.path());
        }
    }

    Err(SkrivError::AudioDownload("Audio file not found after download".into()))
}

/// Build the ffmpeg argument list that cuts `range` out of `source` into an MP3.
///
/// Output is mono at 64 kbps, about 29 MB per hour, which keeps long cuts
/// under Telegram's upload limit.
fn trim_args(source: &Path, dest: &Path, range: &TimeRange) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(start_ms) = range.start_millis() {
        args.push("-ss".to_string());
        args.push(format_millis(start_ms));
    }

    args.push("-i".to_string());
    args.push(source.display().to_string());

    // After an input seek, output timestamps restart at zero, so the end is a length.
    if let Some(end_ms) = range.end_millis() {
        let length_ms = end_ms.saturating_sub(range.start_millis().unwrap_or(0));
        args.push("-t".to_string());
        args.push(format_millis(length_ms));
    }

    args.extend(
        [
            "-vn", "-ac", "1", "-codec:a", "libmp3lame", "-b:a", "64k", "-y", "-loglevel",
            "error",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(dest.display().to_string());
    args
}

fn format_millis(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Cuts `range` out of `source` and writes it to `dest` as MP3.
#[instrument(skip_all, fields(range = %range))]
pub async fn trim_audio(source: &Path, dest: &Path, range: &TimeRange) -> Result<()> {
    debug!("Trimming {:?} to {:?}", source, dest);

    let result = Command::new("ffmpeg")
        .args(trim_args(source, dest, range))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() && dest.exists() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(SkrivError::AudioDownload(format!("ffmpeg trim failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SkrivError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(SkrivError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}

/// Offsets and lengths, in seconds, of the chunks covering `total_seconds`.
fn segment_plan(total_seconds: f64, chunk_seconds: u32) -> Vec<(f64, f64)> {
    let chunk_len = f64::from(chunk_seconds.max(1));

    if total_seconds <= chunk_len {
        return vec![(0.0, total_seconds.max(0.0))];
    }

    let mut plan = Vec::new();
    let mut offset = 0.0;
    while offset < total_seconds {
        plan.push((offset, chunk_len.min(total_seconds - offset)));
        offset += chunk_len;
    }
    plan
}

/// Splits `source` into chunks of about `chunk_seconds` inside `output_dir`.
///
/// Returns `(chunk_path, offset_seconds)` pairs in playback order. Audio no
/// longer than one chunk comes back as the source itself.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    let total_duration = probe_duration(source).await?;
    let plan = segment_plan(total_duration, chunk_seconds);

    if plan.len() == 1 {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    std::fs::create_dir_all(output_dir)?;
    info!("Splitting {:.1}s of audio into {} chunks", total_duration, plan.len());

    let mut segments = Vec::with_capacity(plan.len());
    for (idx, (offset, length)) in plan.into_iter().enumerate() {
        let segment_path = output_dir.join(format!("chunk_{:04}.mp3", idx));
        extract_segment(source, &segment_path, offset, length).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));
    }

    Ok(segments)
}

/// Cuts one segment out of `source`, copying the stream when ffmpeg allows it.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match copy_result {
        Ok(status) if status.success() && dest.exists() => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SkrivError::ToolNotFound("ffmpeg".into()));
        }
        _ => {}
    }

    warn!("Stream copy failed, re-encoding segment");

    let output = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-ac").arg("1")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-b:a").arg("64k")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| SkrivError::AudioDownload(format!("ffmpeg error: {e}")))?;

    if output.status.success() && dest.exists() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&output.stderr);
        Err(SkrivError::AudioDownload(format!("ffmpeg segment failed: {err}")))
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SkrivError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(SkrivError::AudioDownload(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(SkrivError::AudioDownload("ffprobe returned error".into()));
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_duration(json_str: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| SkrivError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SkrivError::AudioDownload("Could not determine audio duration".into()))
}
