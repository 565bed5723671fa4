//! Telegram Bot API adapter for [`ChatClient`].
//!
//! Talks to the HTTP Bot API with `reqwest`. Error responses are classified
//! into [`DeliveryError`] variants: HTTP 403 and "chat not found" style
//! responses mean the recipient is unreachable, HTTP 429 carries the
//! platform's `retry_after`.

use std::time::Duration;

use async_trait::async_trait;
use eventcast_core::controls::{ButtonAction, Controls};
use eventcast_core::types::DbId;
use serde::Deserialize;
use serde_json::{json, Value};

use super::chat::{ChatClient, DeliveryError, Media, MessageRef, OutgoingMessage};

/// Default Bot API base URL.
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default timeout for a single Bot API request.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Longest caption the platform accepts on media messages.
const CAPTION_LIMIT: usize = 1024;

/// Descriptions the platform returns for recipients that can never be reached.
const UNREACHABLE_MARKERS: &[&str] = &[
    "chat not found",
    "bot was blocked by the user",
    "user is deactivated",
    "bot can't initiate conversation",
];

// ---------------------------------------------------------------------------
// TelegramConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `BOT_TOKEN` is not set.
    ///
    /// | Variable                   | Required | Default                    |
    /// |----------------------------|----------|----------------------------|
    /// | `BOT_TOKEN`                | yes      |                            |
    /// | `TELEGRAM_API_BASE`        | no       | `https://api.telegram.org` |
    /// | `TELEGRAM_TIMEOUT_SECS`    | no       | `10`                       |
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty())?;
        Some(Self {
            bot_token,
            api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            timeout: Duration::from_secs(
                std::env::var("TELEGRAM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Map a failed Bot API response onto a [`DeliveryError`].
fn classify(http_status: u16, response: &ApiResponse) -> DeliveryError {
    let code = response.error_code.unwrap_or(http_status);
    let description = response.description.clone().unwrap_or_default();

    if code == 429 {
        let retry_after_secs = response
            .parameters
            .as_ref()
            .and_then(|p| p.retry_after)
            .unwrap_or(1);
        return DeliveryError::RateLimited { retry_after_secs };
    }

    let lowered = description.to_lowercase();
    if code == 403 || UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return DeliveryError::RecipientUnreachable(description);
    }

    DeliveryError::Api { code, description }
}

fn reply_markup(controls: &Controls) -> Value {
    let rows: Vec<Vec<Value>> = controls
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Callback(token) => {
                        json!({ "text": button.text, "callback_data": token })
                    }
                    ButtonAction::Url(url) => json!({ "text": button.text, "url": url }),
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

// ---------------------------------------------------------------------------
// TelegramClient
// ---------------------------------------------------------------------------

pub struct TelegramClient {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Invoke a Bot API method and return its `result`.
    async fn call(&self, method: &str, body: Value) -> Result<Value, DeliveryError> {
        let url = format!(
            "{}/bot{}/{method}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        if parsed.ok {
            return Ok(parsed.result.unwrap_or(Value::Null));
        }

        let err = classify(status, &parsed);
        tracing::debug!(method, error = %err, "Bot API call failed");
        Err(err)
    }

    fn message_ref(chat_id: DbId, result: &Value) -> Result<MessageRef, DeliveryError> {
        let message_id = result
            .get("message_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| DeliveryError::Api {
                code: 200,
                description: "response carried no message_id".to_string(),
            })?;
        Ok(MessageRef {
            chat_id,
            message_id,
        })
    }

    async fn send_text(
        &self,
        chat_id: DbId,
        text: &str,
        controls: &Controls,
    ) -> Result<MessageRef, DeliveryError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if !controls.is_empty() {
            body["reply_markup"] = reply_markup(controls);
        }
        let result = self.call("sendMessage", body).await?;
        Self::message_ref(chat_id, &result)
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send(
        &self,
        recipient: DbId,
        message: &OutgoingMessage,
    ) -> Result<MessageRef, DeliveryError> {
        let Some(media) = &message.media else {
            return self.send_text(recipient, &message.text, &message.controls).await;
        };

        let (method, field, handle) = match media {
            Media::Photo(h) => ("sendPhoto", "photo", h),
            Media::Animation(h) => ("sendAnimation", "animation", h),
        };

        // Captions are capped; long texts follow the media as their own message.
        let fits = message.text.chars().count() <= CAPTION_LIMIT;
        let mut body = json!({ "chat_id": recipient });
        body[field] = json!(handle.as_str());
        if fits {
            body["caption"] = json!(message.text);
            body["parse_mode"] = json!("HTML");
            if !message.controls.is_empty() {
                body["reply_markup"] = reply_markup(&message.controls);
            }
        }

        let result = self.call(method, body).await?;
        if fits {
            Self::message_ref(recipient, &result)
        } else {
            self.send_text(recipient, &message.text, &message.controls).await
        }
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        controls: &Controls,
    ) -> Result<(), DeliveryError> {
        let mut body = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "parse_mode": "HTML",
        });
        if !controls.is_empty() {
            body["reply_markup"] = reply_markup(controls);
        }

        let mut text_body = body.clone();
        text_body["text"] = json!(text);
        match self.call("editMessageText", text_body).await {
            Ok(_) => Ok(()),
            Err(DeliveryError::Api { description, .. })
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            // Media messages carry a caption instead of text.
            Err(DeliveryError::Api { description, .. })
                if description.contains("no text in the message") =>
            {
                body["caption"] = json!(text);
                self.call("editMessageCaption", body).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, message: MessageRef) -> Result<(), DeliveryError> {
        self.call(
            "deleteMessage",
            json!({ "chat_id": message.chat_id, "message_id": message.message_id }),
        )
        .await
        .map(|_| ())
    }
}
