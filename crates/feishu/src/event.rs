//! Inbound event callback payloads (schema 2.0).

use serde::Deserialize;

use crate::error::{Context, Result};

/// Event type for a message sent to the bot.
pub const MESSAGE_RECEIVE_V1: &str = "im.message.receive_v1";

/// Outer shape of every callback the platform posts to the webhook.
///
/// URL verification requests only carry `challenge` (plus a token and type);
/// event deliveries carry `header` and `event`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackEnvelope {
    pub challenge: Option<serde_json::Value>,
    pub header: Option<EventHeader>,
    pub event: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventHeader {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub token: Option<String>,
    pub app_id: Option<String>,
    pub create_time: Option<String>,
}

impl CallbackEnvelope {
    pub fn token(&self) -> Option<&str> {
        self.header.as_ref()?.token.as_deref()
    }

    pub fn event_type(&self) -> Option<&str> {
        self.header.as_ref()?.event_type.as_deref()
    }

    pub fn event_id(&self) -> Option<&str> {
        self.header.as_ref()?.event_id.as_deref()
    }
}

/// Body of an `im.message.receive_v1` event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageReceiveEvent {
    pub sender: Option<EventSender>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventSender {
    pub sender_id: Option<UserId>,
    pub sender_type: Option<String>,
    pub tenant_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserId {
    pub open_id: Option<String>,
    pub union_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventMessage {
    pub message_id: Option<String>,
    pub chat_id: Option<String>,
    pub chat_type: Option<String>,
    pub message_type: Option<String>,
    /// JSON-encoded content; for text messages `{"text": "..."}`.
    pub content: Option<String>,
    pub mentions: Vec<Mention>,
}

/// An @-mention. The message text contains `key` (e.g. `@_user_1`) where the
/// mention was placed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Mention {
    pub key: String,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextContent {
    text: String,
}

impl MessageReceiveEvent {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn sender_open_id(&self) -> Option<&str> {
        self.sender
            .as_ref()?
            .sender_id
            .as_ref()?
            .open_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    pub fn message_type(&self) -> Option<&str> {
        self.message.as_ref()?.message_type.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref()?.message_id.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.message_type() == Some("text")
    }

    /// The question text: mention placeholders removed, whitespace trimmed.
    ///
    /// `Ok(None)` when the text is missing or blank; `Err` when `content`
    /// is not valid JSON.
    pub fn text(&self) -> Result<Option<String>> {
        let Some(message) = self.message.as_ref() else {
            return Ok(None);
        };
        let raw = message.content.as_deref().unwrap_or("{}");
        let content: TextContent =
            serde_json::from_str(raw).context("message content is not valid JSON")?;

        // Longest keys first so `@_user_1` cannot eat the prefix of `@_user_10`.
        let mut keys: Vec<&str> = message
            .mentions
            .iter()
            .map(|m| m.key.as_str())
            .filter(|k| !k.is_empty())
            .collect();
        keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

        let mut text = content.text;
        for key in keys {
            text = text.replace(key, "");
        }

        let text = text.trim();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }
}
