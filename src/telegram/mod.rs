//! Chat transport for Skriv.
//!
//! The bot core only talks to [`ChatTransport`]; [`TelegramClient`] is the
//! production implementation.

mod client;
mod types;

pub use client::TelegramClient;
pub use types::{
    ApiResponse, CallbackQuery, Chat, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message,
    Update, User,
};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Outbound primitives the bot needs from a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Send a text message with a single inline button.
    async fn send_with_button(
        &self,
        chat_id: ChatId,
        text: &str,
        button_label: &str,
        callback_data: &str,
    ) -> Result<()>;

    /// Send a local file as an attachment.
    async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<()>;

    /// Acknowledge a button press.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}
