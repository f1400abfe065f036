//! Streaming chat widget core: decodes a chunked `data:` event stream from the
//! chat backend and folds it into a live conversation transcript.

pub mod config;
pub mod decoder;
pub mod errors;
pub mod models;
pub mod reducer;
pub mod service;
pub mod transcript;
pub mod transport;

pub use config::{Localization, WidgetConfig};
pub use decoder::{EventStream, SseDecoder};
pub use errors::{DecodeError, WidgetError};
pub use models::{ChatRequest, DecodedEvent, Message, Origin, ReplyPayload};
pub use reducer::{ReplyPhase, TranscriptReducer};
pub use service::chat_service::{ChatService, ExchangeOutcome};
pub use transcript::{Transcript, TranscriptChange, TranscriptObserver};
pub use transport::{ByteStream, HttpTransport, Transport};
