use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::WidgetError;

pub const DEFAULT_ENDPOINT: &str = "https://wss.lke.cloud.tencent.com/v1/qbot/chat/sse";

/// User-facing strings. Opaque to the core; only the front end reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    pub placeholder: String,
    pub send_button: String,
    pub typing_indicator: String,
}

impl Default for Localization {
    fn default() -> Self {
        Self {
            placeholder: "Type your message...".to_string(),
            send_button: "Send".to_string(),
            typing_indicator: "AI is typing...".to_string(),
        }
    }
}

/// Routing and session identifiers for the chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub endpoint: String,
    pub bot_app_key: String,
    pub visitor_biz_id: String,
    pub session_id: String,
    pub visitor_labels: Vec<String>,
    pub request_timeout: Option<Duration>,
    pub localization: Localization,
}

impl WidgetConfig {
    /// A config with fresh visitor and session ids.
    pub fn new(endpoint: impl Into<String>, bot_app_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bot_app_key: bot_app_key.into(),
            visitor_biz_id: uuid::Uuid::new_v4().to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            visitor_labels: Vec::new(),
            request_timeout: None,
            localization: Localization::default(),
        }
    }

    pub fn with_visitor_id(mut self, visitor_biz_id: impl Into<String>) -> Self {
        self.visitor_biz_id = visitor_biz_id.into();
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Reads `CHAT_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self, WidgetError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WidgetError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_app_key = get("CHAT_BOT_APP_KEY").ok_or_else(|| WidgetError::MissingConfig {
            key: "CHAT_BOT_APP_KEY".to_string(),
        })?;
        let endpoint = get("CHAT_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(WidgetError::InvalidConfig {
                key: "CHAT_ENDPOINT".to_string(),
                message: format!("'{endpoint}' is not an http(s) URL"),
            });
        }

        let mut config = Self::new(endpoint, bot_app_key);
        if let Some(visitor) = get("CHAT_VISITOR_ID") {
            config.visitor_biz_id = visitor;
        }
        if let Some(session) = get("CHAT_SESSION_ID") {
            config.session_id = session;
        }
        if let Some(labels) = get("CHAT_VISITOR_LABELS") {
            config.visitor_labels = labels
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = get("CHAT_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e| WidgetError::InvalidConfig {
                key: "CHAT_REQUEST_TIMEOUT_SECS".to_string(),
                message: format!("{e}"),
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        let defaults = Localization::default();
        config.localization = Localization {
            placeholder: get("CHAT_PLACEHOLDER").unwrap_or(defaults.placeholder),
            send_button: get("CHAT_SEND_BUTTON").unwrap_or(defaults.send_button),
            typing_indicator: get("CHAT_TYPING_INDICATOR").unwrap_or(defaults.typing_indicator),
        };

        Ok(config)
    }
}
