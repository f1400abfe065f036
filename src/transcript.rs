use std::ops::Index;

use crate::models::{Message, Origin};

/// What just happened to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange {
    Appended { index: usize },
    Replaced { index: usize },
    Completed { index: usize },
    Removed { count: usize },
}

/// Notified after every transcript mutation, with the messages as they now stand.
pub trait TranscriptObserver: Send + Sync {
    fn on_change(&self, change: &TranscriptChange, messages: &[Message]);
}

impl<F> TranscriptObserver for F
where
    F: Fn(&TranscriptChange, &[Message]) + Send + Sync,
{
    fn on_change(&self, change: &TranscriptChange, messages: &[Message]) {
        self(change, messages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered conversation history.
///
/// Append-only apart from the text and completion flag of assistant entries
/// and removal of empty assistant entries. All writes go through the
/// reducer; readers observe them via [`Transcript::subscribe`].
#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
    observers: Vec<(SubscriptionId, Box<dyn TranscriptObserver>)>,
    next_subscription: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl TranscriptObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub(crate) fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        let index = self.messages.len() - 1;
        self.notify(TranscriptChange::Appended { index });
        index
    }

    pub(crate) fn replace_text(&mut self, index: usize, text: &str) -> bool {
        let Some(message) = self.messages.get_mut(index) else {
            return false;
        };
        message.text.clear();
        message.text.push_str(text);
        self.notify(TranscriptChange::Replaced { index });
        true
    }

    pub(crate) fn mark_complete(&mut self, index: usize) -> bool {
        let Some(message) = self.messages.get_mut(index) else {
            return false;
        };
        message.complete = true;
        self.notify(TranscriptChange::Completed { index });
        true
    }

    /// Drops assistant entries that never received any text.
    pub(crate) fn remove_empty_replies(&mut self) -> usize {
        let before = self.messages.len();
        self.messages
            .retain(|m| !(m.origin == Origin::Assistant && m.text.is_empty()));
        let count = before - self.messages.len();
        if count > 0 {
            self.notify(TranscriptChange::Removed { count });
        }
        count
    }

    fn notify(&self, change: TranscriptChange) {
        for (_, observer) in &self.observers {
            observer.on_change(&change, &self.messages);
        }
    }
}

impl Index<usize> for Transcript {
    type Output = Message;

    fn index(&self, index: usize) -> &Message {
        &self.messages[index]
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages)
            .field("observers", &self.observers.len())
            .finish()
    }
}
