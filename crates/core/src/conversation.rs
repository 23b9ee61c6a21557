//! Conversation-related types, and the update protocol that folds gateway
//! events into the visible conversation.
//!
//! [`ChatState`] is a plain reducer: it never talks to the backend itself.
//! An exchange goes through `submit`, any number of `apply` calls, and then
//! either `complete` or `fail`. Submissions are rejected while an exchange
//! is in flight.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Local};

use crate::gateway::ExchangeEvent;

/// Identifies a message within its conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person typing.
    User,
    /// The backend model.
    Model,
}

/// One conversational turn.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    id: MessageId,
    role: Role,
    text: String,
    image_url: Option<String>,
    timestamp: DateTime<Local>,
}

impl Message {
    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the role of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text, which keeps growing while a model message is
    /// streaming.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the attached image, if any.
    #[inline]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Returns the creation time.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// The ordered list of messages, in display order.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    /// Returns all messages.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Looks up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|msg| msg.id == id)
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn push(&mut self, role: Role, text: String) -> MessageId {
        // Ids keep counting across resets, so a stale id never matches.
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            text,
            image_url: None,
            timestamp: Local::now(),
        });
        id
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|msg| msg.id == id)
    }

    fn remove(&mut self, id: MessageId) -> Option<Message> {
        let idx = self.messages.iter().position(|msg| msg.id == id)?;
        Some(self.messages.remove(idx))
    }
}

/// Where the current exchange is at.
///
/// `Submitted` and `Streaming` both count as loading. A finished exchange,
/// successful or not, goes back to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExchangeStage {
    /// Nothing in flight, submissions are accepted.
    #[default]
    Idle,
    /// The user message and the placeholder are in, no event yet.
    Submitted,
    /// At least one event has been applied.
    Streaming,
}

/// Handle to an accepted submission.
///
/// It carries the placeholder the exchange writes into, and is consumed
/// when the exchange completes or fails.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingExchange {
    placeholder: MessageId,
    text: String,
}

impl PendingExchange {
    /// Returns the id of the model placeholder.
    #[inline]
    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }

    /// Returns the trimmed user text to send to the backend.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Everything the presentation layer renders.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    conversation: Conversation,
    stage: ExchangeStage,
    error: Option<String>,
    message_count: u64,
}

impl ChatState {
    /// Creates an empty state.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the conversation.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the stage of the current exchange.
    #[inline]
    pub fn stage(&self) -> ExchangeStage {
        self.stage
    }

    /// Returns `true` while an exchange is in flight.
    #[inline]
    pub fn is_loading(&self) -> bool {
        self.stage != ExchangeStage::Idle
    }

    /// Returns the error of the last failed exchange.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns how many submissions have been accepted. Not affected by
    /// [`ChatState::reset`].
    #[inline]
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Accepts a user submission.
    ///
    /// Appends the user message and an empty model placeholder as a pair
    /// and enters the loading state. Returns `None`, changing nothing, for
    /// blank input or while another exchange is in flight.
    pub fn submit(&mut self, input: &str) -> Option<PendingExchange> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        if self.is_loading() {
            debug!("submission rejected, an exchange is in flight");
            return None;
        }

        self.conversation.push(Role::User, text.to_owned());
        let placeholder = self.conversation.push(Role::Model, String::new());
        self.stage = ExchangeStage::Submitted;
        self.error = None;
        self.message_count += 1;

        Some(PendingExchange {
            placeholder,
            text: text.to_owned(),
        })
    }

    /// Folds one gateway event into the placeholder of `pending`.
    ///
    /// Text chunks are appended, an image is attached unless one already
    /// is. Events whose target is gone or isn't a model message are
    /// ignored.
    pub fn apply(&mut self, pending: &PendingExchange, event: &ExchangeEvent) {
        let Some(message) = self
            .conversation
            .get_mut(pending.placeholder)
            .filter(|msg| msg.role == Role::Model)
        else {
            debug!("ignored {event:?} for {}", pending.placeholder);
            return;
        };

        match event {
            ExchangeEvent::TextChunk(chunk) => message.text.push_str(chunk),
            ExchangeEvent::ImageReady(url) => {
                if message.image_url.is_none() {
                    message.image_url = Some(url.clone());
                } else {
                    debug!("{} already has an image", pending.placeholder);
                }
            }
        }
        self.stage = ExchangeStage::Streaming;
    }

    /// Ends a successful exchange. The placeholder keeps what was streamed.
    pub fn complete(&mut self, pending: PendingExchange) {
        trace!("exchange for {} completed", pending.placeholder);
        self.stage = ExchangeStage::Idle;
    }

    /// Ends a failed exchange: the placeholder is removed, the user message
    /// stays, and `message` becomes the visible error.
    pub fn fail(&mut self, pending: PendingExchange, message: impl Into<String>) {
        self.conversation.remove(pending.placeholder);
        self.error = Some(message.into());
        self.stage = ExchangeStage::Idle;
    }

    /// Discards the whole conversation along with the error and loading
    /// state.
    pub fn reset(&mut self) {
        self.conversation.messages.clear();
        self.error = None;
        self.stage = ExchangeStage::Idle;
    }
}
