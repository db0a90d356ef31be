//! Error types for Skriv.

use thiserror::Error;

/// Library-level error type for Skriv operations.
#[derive(Error, Debug)]
pub enum SkrivError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid time format '{0}'. Expected SS, MM:SS or HH:MM:SS")]
    InvalidTimeFormat(String),

    #[error("Invalid time range: end ({end}s) must be after start ({start}s)")]
    InvalidTimeRange { start: u64, end: u64 },

    #[error("No URL was provided for this request")]
    MissingUrl,

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SkrivError {
    /// Whether the error was caused by bad caller input rather than a failing dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SkrivError::InvalidTimeFormat(_)
                | SkrivError::InvalidTimeRange { .. }
                | SkrivError::MissingUrl
                | SkrivError::InvalidInput(_)
        )
    }
}

/// Result type alias for Skriv operations.
pub type Result<T> = std::result::Result<T, SkrivError>;
