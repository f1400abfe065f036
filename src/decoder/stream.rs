use std::collections::VecDeque;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{DecodeError, WidgetError};
use crate::models::DecodedEvent;
use crate::transport::ByteStream;

use super::SseDecoder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub chunks: usize,
    pub bytes: usize,
    pub events: usize,
    pub ignored_lines: usize,
    pub malformed_lines: usize,
}

/// Lazily decodes a response body into events, pulling the next chunk only
/// when the queue of already-decoded events runs dry.
///
/// Decode errors are logged, counted and sent to the optional error channel;
/// they are never yielded. A transport error is yielded once and ends the
/// stream.
pub struct EventStream {
    body: ByteStream,
    decoder: Option<SseDecoder>,
    queue: VecDeque<DecodedEvent>,
    errors: Option<mpsc::UnboundedSender<DecodeError>>,
    stats: DecodeStats,
}

impl EventStream {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            decoder: Some(SseDecoder::new()),
            queue: VecDeque::new(),
            errors: None,
            stats: DecodeStats::default(),
        }
    }

    /// Routes decode errors to `tx` in addition to the log.
    pub fn with_error_channel(mut self, tx: mpsc::UnboundedSender<DecodeError>) -> Self {
        self.errors = Some(tx);
        self
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub async fn next(&mut self) -> Option<Result<DecodedEvent, WidgetError>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(Ok(event));
            }

            // Finished, or a transport error already ended us.
            if self.decoder.is_none() {
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.absorb(&chunk),
                Some(Err(e)) => {
                    self.decoder = None;
                    return Some(Err(e));
                }
                None => {
                    if let Some(tail) = self.decoder.take().and_then(SseDecoder::finish) {
                        debug!(discarded = %tail, "Stream ended without a trailing newline");
                    }
                    return None;
                }
            }
        }
    }

    fn absorb(&mut self, chunk: &[u8]) {
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len();

        let output = decoder.push(chunk);
        self.stats.ignored_lines += output.ignored_lines;
        for result in output.events {
            match result {
                Ok(event) => {
                    self.stats.events += 1;
                    self.queue.push_back(event);
                }
                Err(e) => {
                    self.stats.malformed_lines += 1;
                    warn!("Skipping undecodable event line: {e}");
                    if let Some(tx) = &self.errors {
                        let _ = tx.send(e);
                    }
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<DecodedEvent, WidgetError>> + Send {
        futures_util::stream::unfold(self, |mut events| async move {
            events.next().await.map(|item| (item, events))
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::stream;

    use super::*;

    fn body(chunks: Vec<Result<String, WidgetError>>) -> ByteStream {
        stream::iter(chunks.into_iter().map(|c| c.map(Bytes::from))).boxed()
    }

    fn ok(s: impl Into<String>) -> Result<String, WidgetError> {
        Ok(s.into())
    }

    fn reply(content: &str) -> String {
        format!(r#"data: {{"type":"reply","payload":{{"content":"{content}","can_rating":true}}}}"#)
    }

    #[tokio::test]
    async fn yields_events_in_order_then_ends() {
        let chunks = vec![
            ok(format!("{}\n", reply("Hi"))),
            ok(format!("{}\n", reply("Hi there"))),
        ];
        let mut events = EventStream::new(body(chunks));

        let a = events.next().await.unwrap().unwrap();
        let b = events.next().await.unwrap().unwrap();
        assert_eq!(a.qualifying_content(), Some("Hi"));
        assert_eq!(b.qualifying_content(), Some("Hi there"));
        assert!(events.next().await.is_none());
        assert!(events.next().await.is_none());

        let stats = events.stats();
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.events, 2);
        assert_eq!(stats.malformed_lines, 0);
    }

    #[tokio::test]
    async fn malformed_lines_go_to_side_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chunks = vec![ok("data: {not json\ndata: {\"type\":\"ping\"}\n")];
        let mut events = EventStream::new(body(chunks)).with_error_channel(tx);

        assert_eq!(events.next().await.unwrap().unwrap().kind(), "ping");
        assert!(events.next().await.is_none());
        assert!(matches!(rx.try_recv(), Ok(DecodeError::InvalidJson { .. })));
        assert_eq!(events.stats().malformed_lines, 1);
    }

    #[tokio::test]
    async fn transport_error_is_yielded_once() {
        let chunks = vec![
            ok("data: {\"type\":\"ping\"}\n"),
            Err(WidgetError::stream("connection reset")),
            ok("data: {\"type\":\"never\"}\n"),
        ];
        let mut events = EventStream::new(body(chunks));

        assert!(events.next().await.unwrap().is_ok());
        assert!(matches!(events.next().await, Some(Err(WidgetError::Stream { .. }))));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn unterminated_tail_is_dropped() {
        let chunks = vec![ok("data: {\"type\":\"ping\"}\ndata: {\"type\":\"lost\"}")];
        let collected: Vec<_> = EventStream::new(body(chunks)).into_stream().collect().await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].as_ref().unwrap().kind(), "ping");
    }
}
