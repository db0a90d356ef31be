//! Poll command - run the bot with `getUpdates` long polling.

use crate::bot::BotRuntime;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the bot until Ctrl+C.
pub async fn run_poll(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Poll, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'skriv doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let runtime = BotRuntime::start(&settings)?;

    Output::header("Skriv Bot (long polling)");
    Output::info("Press Ctrl+C to stop.");

    tokio::select! {
        result = runtime.bot.run_polling(&runtime.client, settings.telegram.poll_timeout_seconds) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            Output::info("Shutting down.");
        }
    }

    Ok(())
}
