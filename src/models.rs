use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::WidgetConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript entry. `text` is formatted markup for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub origin: Origin,
    pub text: String,
    /// Only meaningful for assistant entries; false while the reply streams.
    pub complete: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(origin: Origin, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            origin,
            text: text.into(),
            complete: false,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Origin::User, text)
    }

    /// An empty, in-progress assistant entry awaiting its first reply event.
    pub fn placeholder() -> Self {
        Self::new(Origin::Assistant, String::new())
    }

    pub fn is_user(&self) -> bool {
        self.origin == Origin::User
    }

    /// Whether the front end should offer to copy this entry.
    pub fn is_copyable(&self) -> bool {
        self.origin == Origin::Assistant && self.complete && !self.text.is_empty()
    }
}

/// Request body posted to the chat backend.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub content: String,
    pub bot_app_key: String,
    pub visitor_biz_id: String,
    pub session_id: String,
    pub visitor_labels: Vec<String>,
}

impl ChatRequest {
    pub fn new(config: &WidgetConfig, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            bot_app_key: config.bot_app_key.clone(),
            visitor_biz_id: config.visitor_biz_id.clone(),
            session_id: config.session_id.clone(),
            visitor_labels: config.visitor_labels.clone(),
        }
    }
}

/// Payload of a `reply` event. Every field is optional on the wire.
///
/// Only `content` is strictly typed. Flags follow JSON truthiness and the id
/// fields tolerate any type, so an odd value in one of them never costs the
/// reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplyPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "can_rating", deserialize_with = "truthy")]
    pub can_rate: bool,
    #[serde(default, deserialize_with = "loose_id")]
    pub record_id: Option<String>,
    #[serde(default, deserialize_with = "loose_id")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub is_final: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub is_from_self: bool,
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn loose_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl ReplyPayload {
    /// The content to show, if this reply carries non-empty content and may be rated.
    pub fn qualifying_content(&self) -> Option<&str> {
        match self.content.as_deref() {
            Some(content) if !content.is_empty() && self.can_rate => Some(content),
            _ => None,
        }
    }
}

/// One decoded `data:` line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    Reply(ReplyPayload),
    /// Any other event kind; recognised but not acted on.
    Other {
        kind: String,
        payload: serde_json::Value,
    },
}

impl DecodedEvent {
    pub const REPLY: &'static str = "reply";

    pub fn kind(&self) -> &str {
        match self {
            DecodedEvent::Reply(_) => Self::REPLY,
            DecodedEvent::Other { kind, .. } => kind,
        }
    }

    pub fn qualifying_content(&self) -> Option<&str> {
        match self {
            DecodedEvent::Reply(payload) => payload.qualifying_content(),
            DecodedEvent::Other { .. } => None,
        }
    }
}
