use thiserror::Error;

/// A `data:` line whose payload could not be turned into a typed event.
/// Never fatal: the stream keeps going after one of these.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed event payload {payload:?}: {source}")]
    InvalidJson {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event '{kind}' has an unexpected payload shape: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn invalid_json(payload: impl Into<String>, source: serde_json::Error) -> Self {
        DecodeError::InvalidJson { payload: payload.into(), source }
    }
}

/// Top-level widget error. All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum WidgetError {
    // ── Transport errors ─────────────────────────────────────────────────────
    #[error("Request to chat backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chat backend responded with status {status}")]
    HttpStatus { status: u16 },

    #[error("Chat backend response has no readable body")]
    NoResponseBody,

    #[error("Reply stream broke off: {message}")]
    Stream { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Message cannot be empty")]
    EmptyInput,

    #[error("A reply is still streaming; wait for it to finish")]
    ExchangeInProgress,

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("Missing required setting '{key}'")]
    MissingConfig { key: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidConfig { key: String, message: String },
}

impl WidgetError {
    pub fn stream(message: impl Into<String>) -> Self {
        WidgetError::Stream { message: message.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WidgetError::EmptyInput | WidgetError::ExchangeInProgress)
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WidgetError::Http(_)
                | WidgetError::HttpStatus { .. }
                | WidgetError::NoResponseBody
                | WidgetError::Stream { .. }
        )
    }

    pub fn is_config(&self) -> bool {
        matches!(self, WidgetError::MissingConfig { .. } | WidgetError::InvalidConfig { .. })
    }
}
