//! Inbound events, decoded from Telegram updates.

use super::messages::SKIP_DATA;
use crate::telegram::{ChatId, Update};
use regex::Regex;
use std::sync::OnceLock;

/// A bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Transcribe,
    Cancel,
    Other(String),
}

impl Command {
    /// Parse `/name`, `/name@botname` or `/name args`. Returns None for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        static COMMAND: OnceLock<Regex> = OnceLock::new();
        let re = COMMAND.get_or_init(|| {
            Regex::new(r"^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s|$)").expect("Invalid regex")
        });

        let name = re.captures(text.trim())?.get(1)?.as_str().to_lowercase();
        Some(match name.as_str() {
            "start" => Command::Start,
            "transcribe" => Command::Transcribe,
            "cancel" => Command::Cancel,
            _ => Command::Other(name),
        })
    }
}

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    Text(String),
    /// The skip button was pressed.
    Skip,
    /// Some other inline button was pressed.
    Button(String),
}

/// An event together with who sent it and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub chat_id: ChatId,
    pub user_id: i64,
    /// Set for button presses, which must be answered.
    pub callback_id: Option<String>,
    pub event: Event,
}

impl Inbound {
    /// Decode an update. Updates the bot does not react to give None.
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(query) = update.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(ChatId(query.from.id));
            let event = match query.data.as_deref() {
                Some(SKIP_DATA) => Event::Skip,
                other => Event::Button(other.unwrap_or_default().to_string()),
            };
            return Some(Self {
                chat_id,
                user_id: query.from.id,
                callback_id: Some(query.id),
                event,
            });
        }

        let message = update.message?;
        let text = message.text?;
        let user_id = message.from.map(|u| u.id).unwrap_or(message.chat.id.0);

        let event = match Command::parse(&text) {
            Some(command) => Event::Command(command),
            None => Event::Text(text),
        };

        Some(Self {
            chat_id: message.chat.id,
            user_id,
            callback_id: None,
            event,
        })
    }
}
