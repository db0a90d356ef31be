//! Telegram Bot API client over reqwest.

use super::types::{ApiResponse, ChatId, InlineKeyboardMarkup, Update};
use super::ChatTransport;
use crate::error::{Result, SkrivError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout; uploads of trimmed audio can take a while.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_HEADROOM_SECS: u64 = 15;

/// Thin client for the methods the bot uses.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a client for `token` against `api_url` (normally `https://api.telegram.org`).
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Call a JSON method and unwrap the `ok`/`result` envelope.
    async fn call<P, R>(&self, method: &str, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_with_timeout(method, payload, None).await
    }

    /// Like [`call`](Self::call), with a request timeout replacing the client default.
    async fn call_with_timeout<P, R>(
        &self,
        method: &str,
        payload: &P,
        timeout: Option<Duration>,
    ) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("Calling Telegram method {}", method);

        let mut request = self.http.post(self.method_url(method)).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response: ApiResponse<R> = request.send().await?.json().await?;

        unwrap_response(method, response)
    }

    /// Send a text message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        let _: serde_json::Value = self.call("sendMessage", &payload).await?;
        Ok(())
    }

    /// Upload a local file as a document.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn send_document_file(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));

        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        unwrap_response("sendDocument", response).map(|_| ())
    }

    /// Stop the client-side spinner on a pressed button.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_query_id }),
            )
            .await?;
        Ok(())
    }

    /// Register the webhook URL. Returns Telegram's raw response body.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<serde_json::Value> {
        let mut payload = json!({ "url": url });
        if let Some(secret) = secret_token {
            payload["secret_token"] = json!(secret);
        }

        let response = self
            .http
            .post(self.method_url("setWebhook"))
            .json(&payload)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        Ok(response)
    }

    /// Remove the webhook so `getUpdates` can be used.
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call_with_timeout("getUpdates", &payload, Some(poll_request_timeout(timeout_secs)))
            .await
    }
}

/// HTTP timeout for a long poll: the server holds the request for up to `timeout_secs`.
fn poll_request_timeout(timeout_secs: u64) -> Duration {
    Duration::from_secs(timeout_secs.saturating_add(POLL_HEADROOM_SECS))
}

fn unwrap_response<R>(method: &str, response: ApiResponse<R>) -> Result<R> {
    if !response.ok {
        return Err(SkrivError::Telegram(format!(
            "{} failed ({}): {}",
            method,
            response.error_code.unwrap_or_default(),
            response.description.unwrap_or_else(|| "no description".to_string())
        )));
    }

    response
        .result
        .ok_or_else(|| SkrivError::Telegram(format!("{} returned no result", method)))
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text, None).await
    }

    async fn send_with_button(
        &self,
        chat_id: ChatId,
        text: &str,
        button_label: &str,
        callback_data: &str,
    ) -> Result<()> {
        let markup = InlineKeyboardMarkup::single(button_label, callback_data);
        self.send_message(chat_id, text, Some(&markup)).await
    }

    async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        self.send_document_file(chat_id, path).await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.answer_callback_query(callback_id).await
    }
}
