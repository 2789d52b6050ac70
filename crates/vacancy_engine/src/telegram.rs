//! Telegram Bot API transport: `sendMessage` out, `getUpdates` long-poll in.

use std::time::Duration;

use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use vacancy_core::{truncate_message, ChatId, Menu, Msg, UpdateId};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(String),
    #[error("api error: {description}")]
    Api { description: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.to_string())
    }
}

/// One inbound update. `id` is present even when the payload is not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: UpdateId,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    Message { chat_id: ChatId, text: String },
    Callback { chat_id: ChatId, token: String },
    Ignored,
}

impl Update {
    pub fn into_msg(self) -> Option<Msg> {
        match self.kind {
            UpdateKind::Message { chat_id, text } => Some(Msg::Command { chat_id, text }),
            UpdateKind::Callback { chat_id, token } => Some(Msg::Callback { chat_id, token }),
            UpdateKind::Ignored => None,
        }
    }
}

#[async_trait::async_trait]
pub trait BotApi: Send + Sync {
    /// Returns whether the message was accepted. Failures are logged, not raised.
    async fn send_message(&self, chat_id: ChatId, text: &str, menu: Option<&Menu>) -> bool;

    /// Long-poll for updates after `offset`, letting the server hold the request for `wait`.
    async fn get_updates(
        &self,
        offset: Option<UpdateId>,
        wait: Duration,
    ) -> Result<Vec<Update>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub api_base: String,
    pub send_timeout: Duration,
    /// Added on top of the long-poll wait for the client-side timeout.
    pub poll_slack: Duration,
    /// Log outbound messages instead of sending them.
    pub muted: bool,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            send_timeout: Duration::from_secs(20),
            poll_slack: Duration::from_secs(10),
            muted: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Vec<Value>,
    description: Option<String>,
}

pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
    settings: TelegramSettings,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, settings: TelegramSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            token: token.into(),
            settings,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.settings.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }
}

#[async_trait::async_trait]
impl BotApi for TelegramClient {
    async fn send_message(&self, chat_id: ChatId, text: &str, menu: Option<&Menu>) -> bool {
        if self.settings.muted {
            monitor_info!("Notifications disabled, not sending to chat {}", chat_id);
            return false;
        }

        let mut form = vec![
            ("chat_id", chat_id.to_string()),
            ("text", truncate_message(text).to_string()),
            ("parse_mode", "HTML".to_string()),
            ("disable_web_page_preview", "true".to_string()),
        ];
        if let Some(menu) = menu {
            form.push(("reply_markup", keyboard_json(menu)));
        }

        let response = match self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(self.settings.send_timeout)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                // reqwest errors embed the URL, which carries the token.
                monitor_warn!(
                    "Sending to chat {} failed: {}",
                    chat_id,
                    err.without_url()
                );
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            monitor_debug!("Sent message to chat {}", chat_id);
            return true;
        }

        let body = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<Envelope>(&body)
            .ok()
            .and_then(|envelope| envelope.description)
            .unwrap_or(body);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            monitor_warn!(
                "Sending to chat {} failed: HTTP 401 {}. Check TELEGRAM_BOT_TOKEN.",
                chat_id,
                description
            );
        } else {
            monitor_warn!(
                "Sending to chat {} failed: HTTP {} {}",
                chat_id,
                status.as_u16(),
                description
            );
        }
        false
    }

    async fn get_updates(
        &self,
        offset: Option<UpdateId>,
        wait: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let mut query = vec![("timeout", wait.as_secs().to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .timeout(wait + self.settings.poll_slack)
            .query(&query)
            .send()
            .await
            .map_err(|err| TransportError::from(err.without_url()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::from(err.without_url()))?;

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Http(format!("status {}", status.as_u16())))
            }
            Err(err) => return Err(TransportError::Decode(err.to_string())),
        };
        if !envelope.ok {
            return Err(TransportError::Api {
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("status {}", status.as_u16())),
            });
        }

        Ok(envelope.result.iter().filter_map(parse_update).collect())
    }
}

fn keyboard_json(menu: &Menu) -> String {
    let rows: Vec<Vec<Value>> = menu
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|choice| json!({ "text": choice.label, "callback_data": choice.token }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows }).to_string()
}

fn parse_update(raw: &Value) -> Option<Update> {
    let id = raw.get("update_id")?.as_i64()?;
    Some(Update {
        id,
        kind: parse_kind(raw),
    })
}

fn parse_kind(raw: &Value) -> UpdateKind {
    if let Some(callback) = raw.get("callback_query").filter(|v| v.is_object()) {
        let chat_id = callback.pointer("/message/chat/id").and_then(Value::as_i64);
        let token = callback
            .get("data")
            .and_then(Value::as_str)
            .filter(|data| !data.is_empty());
        return match (chat_id, token) {
            (Some(chat_id), Some(token)) => UpdateKind::Callback {
                chat_id,
                token: token.to_string(),
            },
            _ => UpdateKind::Ignored,
        };
    }

    let message = raw
        .get("message")
        .or_else(|| raw.get("edited_message"))
        .filter(|v| v.is_object());
    let Some(message) = message else {
        return UpdateKind::Ignored;
    };
    match message.pointer("/chat/id").and_then(Value::as_i64) {
        Some(chat_id) => UpdateKind::Message {
            chat_id,
            text: message
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
        },
        None => UpdateKind::Ignored,
    }
}
