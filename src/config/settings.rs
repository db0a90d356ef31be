//! Configuration settings for Skriv.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub telegram: TelegramSettings,
    pub transcription: TranscriptionSettings,
    pub delivery: DeliverySettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for per-job scratch files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/skriv".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot token issued by BotFather.
    pub bot_token: Option<String>,
    /// Bot API base URL.
    pub api_url: String,
    /// User IDs allowed to talk to the bot. Empty means nobody.
    pub allowed_user_ids: Vec<i64>,
    /// Chat that receives a cost report after every job.
    pub support_chat_id: Option<i64>,
    /// Secret Telegram echoes back in `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<String>,
    /// Long-poll timeout for `getUpdates`.
    pub poll_timeout_seconds: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: "https://api.telegram.org".to_string(),
            allowed_user_ids: Vec::new(),
            support_chat_id: None,
            webhook_secret: None,
            poll_timeout_seconds: 30,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Spoken language hint (ISO-639-1).
    pub language: String,
    /// Price in USD per minute of audio, used for cost reports.
    pub cost_per_minute: f64,
    /// Timeout for a single API request in seconds.
    pub request_timeout_seconds: u64,
    /// Audio longer than this is sent to Whisper in chunks of this length.
    pub chunk_duration_seconds: u32,
    /// Chunks transcribed at the same time.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: "ru".to_string(),
            cost_per_minute: 0.006,
            request_timeout_seconds: 300,
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 4,
        }
    }
}

/// Outbound message settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Longest text message the transport accepts, in characters.
    pub max_message_length: usize,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_message_length: 4096,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Override file values from environment variables.
    ///
    /// `lookup` is injected so tests do not have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").or_else(|| lookup("TELEGRAM_BOT_ID")) {
            self.telegram.bot_token = Some(token);
        }

        if let Some(ids) = lookup("ALLOWED_USER_IDS") {
            self.telegram.allowed_user_ids = parse_id_list(&ids)?;
        }

        if let Some(id) = lookup("SUPPORT_CHAT_ID") {
            let id = id.trim().parse().map_err(|_| {
                crate::error::SkrivError::Config(format!("SUPPORT_CHAT_ID is not a chat id: {}", id))
            })?;
            self.telegram.support_chat_id = Some(id);
        }

        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skriv")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// The bot token, or a configuration error when it is missing.
    pub fn bot_token(&self) -> crate::error::Result<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                crate::error::SkrivError::Config(
                    "Telegram bot token not set. Set telegram.bot_token or TELEGRAM_BOT_TOKEN".to_string(),
                )
            })
    }

    /// Copy of the settings that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("********".to_string());
            }
        };
        mask(&mut copy.telegram.bot_token);
        mask(&mut copy.telegram.webhook_secret);
        copy
    }
}

/// Parse a comma separated list of numeric ids, skipping blanks.
fn parse_id_list(raw: &str) -> crate::error::Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                crate::error::SkrivError::Config(format!("Invalid user id in ALLOWED_USER_IDS: {}", s))
            })
        })
        .collect()
}
