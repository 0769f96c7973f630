//! Telegram transport — talks to the Bot API over HTTP.
//!
//! The coordinator depends on the narrow `Transport` trait; `TelegramApi`
//! implements it plus the webhook-management calls `main` needs.

pub mod update;

pub use update::{Inbound, Update};

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::error::TransportError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// What the session coordinator needs from the messaging platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;

    /// Send a text message with a one-row reply keyboard.
    async fn send_text_with_keyboard(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[&str],
    ) -> Result<(), TransportError>;

    /// Send a document from disk, with an optional caption.
    async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Best-effort removal of an inline keyboard from a sent message.
    async fn remove_inline_keyboard(&self, chat_id: &str, message_id: i64);
}

/// Bot API client.
pub struct TelegramApi {
    token: SecretString,
    client: reqwest::Client,
}

impl TelegramApi {
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.token.expose_secret()
        )
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with a
    /// plain-text retry when Telegram rejects the markup.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<(), TransportError> {
        let mut markdown_body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });
        if let Some(ref markup) = reply_markup {
            markdown_body["reply_markup"] = markup.clone();
        }

        let send_failed = |reason: String| TransportError::SendFailed {
            what: "message",
            chat_id: chat_id.to_string(),
            reason,
        };

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let mut plain_body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            plain_body["reply_markup"] = markup;
        }
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(send_failed(format!(
                "sendMessage failed (markdown: {markdown_status}, plain: {plain_err})"
            )));
        }

        Ok(())
    }

    async fn send_chunked(
        &self,
        chat_id: &str,
        text: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<(), TransportError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            // The keyboard only makes sense on the final chunk.
            let markup = if i == last { reply_markup.clone() } else { None };
            self.send_message_chunk(chat_id, chunk, markup).await?;
        }
        Ok(())
    }

    /// Register the webhook endpoint with Telegram.
    pub async fn set_webhook(
        &self,
        url: &str,
        secret_token: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "url": url });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }

        let resp = self
            .client
            .post(self.api_url("setWebhook"))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::WebhookSetup(e.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(TransportError::WebhookSetup(err));
        }

        tracing::info!(url, "Webhook registered");
        Ok(())
    }

    /// Verify the token against the Bot API.
    pub async fn health_check(&self) -> Result<(), TransportError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| TransportError::HealthCheckFailed(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::HealthCheckFailed(format!(
                "getMe returned {}",
                resp.status()
            )))
        }
    }
}

#[async_trait]
impl Transport for TelegramApi {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.send_chunked(chat_id, text, None).await
    }

    async fn send_text_with_keyboard(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[&str],
    ) -> Result<(), TransportError> {
        let markup = json!({
            "keyboard": [buttons.iter().map(|b| json!({"text": b})).collect::<Vec<_>>()],
            "resize_keyboard": true,
            "one_time_keyboard": true,
        });
        self.send_chunked(chat_id, text, Some(markup)).await
    }

    async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let send_failed = |reason: String| TransportError::SendFailed {
            what: "document",
            chat_id: chat_id.to_string(),
            reason,
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("report.pdf");
        let file_bytes = tokio::fs::read(path)
            .await
            .map_err(|e| send_failed(e.to_string()))?;
        let part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(send_failed(format!("sendDocument failed: {err}")));
        }

        tracing::info!(chat_id, file_name, "Document sent");
        Ok(())
    }

    async fn remove_inline_keyboard(&self, chat_id: &str, message_id: i64) {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": {},
        });
        if let Err(e) = self
            .client
            .post(self.api_url("editMessageReplyMarkup"))
            .json(&body)
            .send()
            .await
        {
            tracing::debug!(error = %e, "editMessageReplyMarkup failed");
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let chunk = &remaining[..max_len];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(max_len);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { max_len } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_includes_token_and_method() {
        let api = TelegramApi::new(SecretString::from("123:ABC"));
        assert_eq!(
            api.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
        assert_eq!(
            api.api_url("sendDocument"),
            "https://api.telegram.org/bot123:ABC/sendDocument"
        );
    }

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[tokio::test]
    async fn send_document_nonexistent_file() {
        let api = TelegramApi::new(SecretString::from("fake-token"));
        let result = api
            .send_document("123", Path::new("/nonexistent/report.pdf"), None)
            .await;
        assert!(result.is_err());
    }
}
