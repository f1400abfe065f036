use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::WidgetConfig;
use crate::decoder::{DecodeStats, EventStream};
use crate::errors::{DecodeError, WidgetError};
use crate::models::ChatRequest;
use crate::reducer::{ReplyPhase, TranscriptReducer};
use crate::transcript::Transcript;
use crate::transport::Transport;

/// How a call to [`ChatService::submit`] ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    Completed {
        qualifying_events: usize,
        malformed_lines: usize,
    },
}

/// One chat session: a transcript plus the transport it talks through.
///
/// `submit` takes `&mut self`, so exchanges on one session are serialised.
pub struct ChatService<T> {
    config: WidgetConfig,
    transport: T,
    transcript: Transcript,
    reducer: TranscriptReducer,
    decode_errors: Option<mpsc::UnboundedSender<DecodeError>>,
}

impl<T: Transport> ChatService<T> {
    pub fn new(config: WidgetConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            transcript: Transcript::new(),
            reducer: TranscriptReducer::new(),
            decode_errors: None,
        }
    }

    /// Forwards every undecodable event line to `tx`.
    pub fn with_decode_errors(mut self, tx: mpsc::UnboundedSender<DecodeError>) -> Self {
        self.decode_errors = Some(tx);
        self
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// For subscribing observers.
    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn phase(&self) -> ReplyPhase {
        self.reducer.phase()
    }

    pub fn awaiting_reply(&self) -> bool {
        self.reducer.awaiting_reply()
    }

    /// Sends `text` and folds the streamed reply into the transcript.
    ///
    /// Blank input is suppressed and reported as [`ExchangeOutcome::Ignored`].
    /// A transport failure abandons the exchange and is returned; the session
    /// stays usable for the next submission.
    pub async fn submit(&mut self, text: &str) -> Result<ExchangeOutcome, WidgetError> {
        match self.reducer.on_user_submit(&mut self.transcript, text) {
            Ok(()) => {}
            Err(WidgetError::EmptyInput) => {
                debug!("Ignoring blank submission");
                return Ok(ExchangeOutcome::Ignored);
            }
            Err(e) => return Err(e),
        }

        let request = ChatRequest::new(&self.config, text);
        let body = match self.transport.open(&request).await {
            Ok(body) => body,
            Err(e) => return Err(self.fail(e)),
        };
        self.reducer.on_stream_open(&mut self.transcript);

        let mut events = EventStream::new(body);
        if let Some(tx) = &self.decode_errors {
            events = events.with_error_channel(tx.clone());
        }

        let mut qualifying_events = 0;
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    if self.reducer.on_event(&mut self.transcript, &event) {
                        qualifying_events += 1;
                    }
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.reducer.on_stream_end(&mut self.transcript);
        let stats: DecodeStats = events.stats();
        info!(
            qualifying_events,
            events = stats.events,
            malformed = stats.malformed_lines,
            bytes = stats.bytes,
            "Reply stream finished"
        );
        Ok(ExchangeOutcome::Completed {
            qualifying_events,
            malformed_lines: stats.malformed_lines,
        })
    }

    fn fail(&mut self, err: WidgetError) -> WidgetError {
        error!("Chat exchange failed: {err}");
        self.reducer.on_transport_error(&mut self.transcript, err)
    }
}
