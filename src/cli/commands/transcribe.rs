//! Transcribe command implementation.

use crate::audio::validate_url;
use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::timecode::TimeRange;
use anyhow::Result;

/// Run the transcribe command.
pub async fn run_transcribe(
    url: &str,
    start: Option<&str>,
    end: Option<&str>,
    output: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    // Bad input should fail before the slower tool checks.
    validate_url(url)?;
    let range = TimeRange::parse(start, end)?;

    if let Err(e) = preflight::check(Operation::Transcribe, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'skriv doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    Output::info(&format!("Processing: {} ({})", url, range));

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Downloading and transcribing...");
    let result = orchestrator.transcribe_url(url, &range).await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Failed to process: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Transcribed {} of audio (estimated cost ${:.4})",
        format_duration(result.duration_seconds),
        result.cost
    ));

    match output {
        Some(path) => {
            std::fs::write(path, &result.transcript)?;
            Output::success(&format!("Transcript written to {}", path));
        }
        None => println!("\n{}", result.transcript),
    }

    Ok(())
}
