//! Set-webhook command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::telegram::TelegramClient;
use anyhow::Result;

/// Register `url` as the bot's webhook and print Telegram's answer.
pub async fn run_set_webhook(url: &str, settings: &Settings) -> Result<()> {
    let client = TelegramClient::new(&settings.telegram.api_url, settings.bot_token()?)?;

    let response = client
        .set_webhook(url, settings.telegram.webhook_secret.as_deref())
        .await?;

    if response.get("ok").and_then(|v| v.as_bool()) == Some(true) {
        Output::success(&format!("Webhook set to {}", url));
    } else {
        Output::error("Telegram rejected the webhook");
    }
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
