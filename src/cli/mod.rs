//! CLI module for Skriv.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Skriv - Telegram bot that transcribes the audio of online videos
///
/// Runs the bot behind a webhook or with long polling, and offers the same
/// fetch-and-transcribe pipeline on the command line.
#[derive(Parser, Debug)]
#[command(name = "skriv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SKRIV_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (webhook and admin endpoints)
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the bot with long polling instead of a webhook
    Poll,

    /// Transcribe a video URL once and print the transcript
    Transcribe {
        /// Video URL
        url: String,

        /// Start time (SS, MM:SS or HH:MM:SS)
        #[arg(short, long)]
        start: Option<String>,

        /// End time (SS, MM:SS or HH:MM:SS)
        #[arg(short, long)]
        end: Option<String>,

        /// Write the transcript to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Register the bot's webhook URL with Telegram
    SetWebhook {
        /// Public HTTPS URL of the /webhook endpoint
        url: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (bot token masked)
    Show,

    /// Show configuration file path
    Path,
}
