//! Turns a chunked response body into typed events.
//!
//! Wire format: newline separated lines; a line of interest starts with
//! `data:` followed by `{"type": "...", "payload": {...}}`. Every other line
//! is skipped without complaint.

pub mod lines;
pub mod stream;
pub mod utf8;

use serde::Deserialize;
use tracing::debug;

use crate::errors::DecodeError;
use crate::models::{DecodedEvent, ReplyPayload};

pub use lines::LineSplitter;
pub use stream::{DecodeStats, EventStream};
pub use utf8::Utf8Decoder;

pub const DATA_PREFIX: &str = "data:";

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Parses one logical line.
///
/// Returns `None` when the line is not an event candidate.
pub fn parse_line(line: &str) -> Option<Result<DecodedEvent, DecodeError>> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    Some(parse_payload(payload))
}

fn parse_payload(payload: &str) -> Result<DecodedEvent, DecodeError> {
    let envelope: Envelope =
        serde_json::from_str(payload).map_err(|e| DecodeError::invalid_json(payload, e))?;

    if envelope.kind != DecodedEvent::REPLY {
        return Ok(DecodedEvent::Other { kind: envelope.kind, payload: envelope.payload });
    }

    let reply = if envelope.payload.is_null() {
        ReplyPayload::default()
    } else {
        serde_json::from_value(envelope.payload).map_err(|source| DecodeError::InvalidPayload {
            kind: envelope.kind,
            source,
        })?
    };
    Ok(DecodedEvent::Reply(reply))
}

/// What a single chunk produced.
#[derive(Debug, Default)]
pub struct ChunkOutput {
    pub events: Vec<Result<DecodedEvent, DecodeError>>,
    /// Complete lines without the `data:` prefix.
    pub ignored_lines: usize,
}

/// Synchronous core of the decoder: bytes in, events out.
#[derive(Debug, Default)]
pub struct SseDecoder {
    text: Utf8Decoder,
    lines: LineSplitter,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one raw chunk. Events come back in line order.
    pub fn push(&mut self, chunk: &[u8]) -> ChunkOutput {
        let text = self.text.decode(chunk);
        let mut output = ChunkOutput::default();
        for line in self.lines.push(&text) {
            match parse_line(&line) {
                Some(event) => output.events.push(event),
                None => output.ignored_lines += 1,
            }
        }
        output
    }

    /// Ends decoding. The unterminated tail, if any, is returned for logging
    /// and is never parsed.
    pub fn finish(mut self) -> Option<String> {
        if self.text.pending_len() > 0 {
            debug!(bytes = self.text.pending_len(), "Dropping incomplete UTF-8 sequence at end of stream");
        }
        self.lines.take_carry()
    }
}
