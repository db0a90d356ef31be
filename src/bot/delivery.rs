//! Splitting long text into message-sized chunks.

use crate::error::Result;
use crate::telegram::{ChatId, ChatTransport};

/// Split `text` into chunks of at most `max_chars` characters.
///
/// When text remains after a full-size prefix, the cut moves back to the last
/// whitespace inside the prefix so words stay whole; a prefix without any
/// whitespace is cut at the hard limit. Whitespace around a cut is dropped, so
/// no chunk starts or ends with it.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());

        if limit == rest.len() {
            chunks.push(rest.to_string());
            break;
        }

        let prefix = &rest[..limit];
        let cut = prefix
            .char_indices()
            .rev()
            .find(|(idx, c)| *idx > 0 && c.is_whitespace())
            .map(|(idx, _)| idx)
            .unwrap_or(limit);

        chunks.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }

    chunks
}

/// Send `text` to `chat_id` as consecutive messages, stopping at the first failure.
pub async fn deliver_text(
    transport: &dyn ChatTransport,
    chat_id: ChatId,
    text: &str,
    max_chars: usize,
) -> Result<usize> {
    let chunks = split_message(text, max_chars);
    for chunk in &chunks {
        transport.send_text(chat_id, chunk).await?;
    }
    Ok(chunks.len())
}
