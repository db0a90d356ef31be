//! User-facing bot texts.

use chrono::{DateTime, Utc};

pub const GREETING: &str =
    "Hi! I transcribe the audio of videos. Send /transcribe to start or /cancel to stop.";
pub const NOT_AUTHORIZED: &str = "You are not authorized to use this bot.";

pub const ASK_URL: &str = "Send me the URL of the video.";
pub const ASK_START_TIME: &str =
    "Enter the start time as HH:MM:SS (or MM:SS), or press 'Skip' to start from the beginning.";
pub const ASK_END_TIME: &str =
    "Enter the end time as HH:MM:SS (or MM:SS), or press 'Skip' to go to the end.";

pub const SKIP_LABEL: &str = "Skip";
/// Callback payload attached to the skip button.
pub const SKIP_DATA: &str = "skip";

pub const STILL_PROCESSING: &str = "Your request is still being processed. Please wait.";
pub const CANCELLED: &str = "Cancelled. Send /transcribe to start again.";
pub const MISSING_URL: &str = "No URL was given. Send /transcribe to start again.";

pub const JOB_STARTED: &str = "Processing started. This can take a few minutes.";
pub const JOB_DONE: &str = "Your request is done! Transcript:";
pub const JOB_FAILED: &str = "Sorry, processing failed.";
pub const EMPTY_TRANSCRIPT: &str = "Done, but no speech was recognized in the audio.";

/// Reply for a time the parser rejected.
pub fn invalid_time(error: &dyn std::fmt::Display) -> String {
    format!("{}\nSend /transcribe to start again.", error)
}

/// Line posted to the support chat after each job.
pub fn cost_report(user_id: i64, at: DateTime<Utc>, duration_seconds: f64, cost: f64) -> String {
    format!(
        "User {} transcribed {:.1}s of audio at {}. Cost: ${:.4}.",
        user_id,
        duration_seconds,
        at.format("%Y-%m-%d %H:%M:%S UTC"),
        cost
    )
}
