use tracing::{debug, warn};

use crate::errors::WidgetError;
use crate::models::{DecodedEvent, Message};
use crate::transcript::Transcript;

/// Where the current reply cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyPhase {
    #[default]
    Idle,
    AwaitingFirstToken,
    Streaming,
    Done,
}

impl ReplyPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, ReplyPhase::AwaitingFirstToken | ReplyPhase::Streaming)
    }
}

/// Folds session events into a caller-owned [`Transcript`].
#[derive(Debug, Default)]
pub struct TranscriptReducer {
    phase: ReplyPhase,
    awaiting_reply: bool,
    /// Index of the assistant entry still receiving content.
    in_progress: Option<usize>,
}

impl TranscriptReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ReplyPhase {
        self.phase
    }

    /// Drives the "typing" indicator: set on submit, cleared by the first
    /// qualifying reply, stream end, or a transport error.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn in_progress(&self) -> Option<usize> {
        self.in_progress
    }

    /// Appends the user's message and starts a reply cycle.
    ///
    /// Blank text is rejected with [`WidgetError::EmptyInput`]; a submission
    /// while a reply is still pending is rejected with
    /// [`WidgetError::ExchangeInProgress`]. Neither touches the transcript.
    pub fn on_user_submit(&mut self, transcript: &mut Transcript, text: &str) -> Result<(), WidgetError> {
        if text.trim().is_empty() {
            return Err(WidgetError::EmptyInput);
        }
        if self.phase.is_active() {
            return Err(WidgetError::ExchangeInProgress);
        }

        transcript.push(Message::user(text));
        self.phase = ReplyPhase::AwaitingFirstToken;
        self.awaiting_reply = true;
        self.in_progress = None;
        Ok(())
    }

    /// Appends the empty assistant placeholder for the reply about to stream.
    pub fn on_stream_open(&mut self, transcript: &mut Transcript) {
        if self.phase != ReplyPhase::AwaitingFirstToken || self.in_progress.is_some() {
            warn!(phase = ?self.phase, "Ignoring stream open outside of a pending exchange");
            return;
        }
        self.in_progress = Some(transcript.push(Message::placeholder()));
    }

    /// Applies one decoded event. Returns true if the transcript changed.
    ///
    /// A qualifying reply replaces the in-progress text outright; each reply
    /// carries the full answer so far.
    pub fn on_event(&mut self, transcript: &mut Transcript, event: &DecodedEvent) -> bool {
        let Some(content) = event.qualifying_content() else {
            debug!(kind = event.kind(), "Event does not update the transcript");
            return false;
        };
        let Some(index) = self.in_progress else {
            debug!("Reply arrived with no in-progress entry; dropping it");
            return false;
        };

        if !transcript.replace_text(index, content) {
            return false;
        }
        if self.phase == ReplyPhase::AwaitingFirstToken {
            self.phase = ReplyPhase::Streaming;
            self.awaiting_reply = false;
        }
        true
    }

    /// Marks the in-progress entry complete. No entry is created if none exists.
    pub fn on_stream_end(&mut self, transcript: &mut Transcript) {
        if let Some(index) = self.in_progress.take() {
            transcript.mark_complete(index);
        }
        if self.phase.is_active() {
            self.phase = ReplyPhase::Done;
        }
        self.awaiting_reply = false;
    }

    /// Abandons the current exchange and hands `err` back for display.
    ///
    /// Assistant entries that never received text are removed; one with
    /// partial content stays, uncompleted.
    pub fn on_transport_error(&mut self, transcript: &mut Transcript, err: WidgetError) -> WidgetError {
        let removed = transcript.remove_empty_replies();
        debug!(removed, "Cleared empty reply placeholders after transport error");
        self.in_progress = None;
        self.phase = ReplyPhase::Idle;
        self.awaiting_reply = false;
        err
    }
}
