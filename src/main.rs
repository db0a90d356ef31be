//! Skriv CLI entry point.

use anyhow::Result;
use clap::Parser;
use skriv::cli::{commands, Cli, Commands};
use skriv::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("skriv={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.as_deref(), *port, settings).await?;
        }

        Commands::Poll => {
            commands::run_poll(settings).await?;
        }

        Commands::Transcribe { url, start, end, output } => {
            commands::run_transcribe(url, start.as_deref(), end.as_deref(), output.as_deref(), &settings)
                .await?;
        }

        Commands::SetWebhook { url } => {
            commands::run_set_webhook(url, &settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
