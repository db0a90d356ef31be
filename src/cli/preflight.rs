//! Pre-flight checks before long-running operations.
//!
//! Validates that required tools and configuration are available before the
//! bot starts accepting requests that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, SkrivError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// The webhook server runs the bot and the HTTP transcription endpoint.
    Serve,
    /// Long polling runs the bot.
    Poll,
    /// One-off transcription needs the tools and the API key only.
    Transcribe,
}

impl Operation {
    fn needs_bot_token(self) -> bool {
        matches!(self, Operation::Serve | Operation::Poll)
    }
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if operation.needs_bot_token() {
        settings.bot_token()?;
    }
    check_api_key()?;
    check_tool("yt-dlp")?;
    check_tool("ffmpeg")?;
    check_tool("ffprobe")?;
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(SkrivError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(SkrivError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Argument that makes `name` print its version.
pub(crate) fn version_arg(name: &str) -> &'static str {
    match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg(version_arg(name)).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SkrivError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SkrivError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SkrivError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_token_required_for_bot_modes() {
        let settings = Settings::default();
        for operation in [Operation::Serve, Operation::Poll] {
            let err = check(operation, &settings).unwrap_err();
            assert!(matches!(err, SkrivError::Config(_)), "got {:?}", err);
        }
    }

    #[test]
    fn test_version_arg() {
        assert_eq!(version_arg("ffmpeg"), "-version");
        assert_eq!(version_arg("ffprobe"), "-version");
        assert_eq!(version_arg("yt-dlp"), "--version");
    }

    #[test]
    fn test_missing_tool() {
        let err = check_tool("skriv-no-such-tool").unwrap_err();
        assert!(matches!(err, SkrivError::ToolNotFound(name) if name == "skriv-no-such-tool"));
    }
}
