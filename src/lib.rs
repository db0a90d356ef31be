//! Skriv - Telegram transcription bot
//!
//! A Telegram bot that turns the audio of an online video into text.
//!
//! # Overview
//!
//! A user sends `/transcribe`, then a video URL, then optional start and end
//! times. The bot then, in the background:
//! - Downloads the audio with yt-dlp and trims it with ffmpeg
//! - Sends the trimmed audio back to the chat
//! - Transcribes it with OpenAI Whisper
//! - Delivers the transcript in message-sized chunks
//! - Posts a cost report to a support chat
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `timecode` - Clock string parsing and time ranges
//! - `telegram` - Bot API types and client
//! - `audio` - Audio download and trimming
//! - `transcription` - Speech-to-text transcription
//! - `orchestrator` - Pipeline coordination
//! - `bot` - Conversation state machine, jobs and delivery
//! - `cli` - Command line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use skriv::config::Settings;
//! use skriv::orchestrator::Orchestrator;
//! use skriv::timecode::TimeRange;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let range = TimeRange::parse(Some("1:00"), Some("2:30"))?;
//!     let result = orchestrator
//!         .transcribe_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &range)
//!         .await?;
//!     println!("{}", result.transcript);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod bot;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod telegram;
pub mod timecode;
pub mod transcription;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, SkrivError};
