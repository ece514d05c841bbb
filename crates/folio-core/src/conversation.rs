//! Chat session state machine
//!
//! A [`Conversation`] owns the transcript, the composer draft and the
//! in-flight flag. Sending is two synchronous transitions around a single
//! suspension point:
//!
//! 1. [`Conversation::begin_send`] validates and clears the draft, appends the
//!    user turn and flips to [`ChatState::Sending`], handing back an
//!    [`OutboundMessage`].
//! 2. The caller awaits [`OutboundMessage::dispatch`] (directly, or on a
//!    spawned task so the UI keeps drawing).
//! 3. [`Conversation::finish_send`] parses the reply, appends the assistant
//!    turn and returns to [`ChatState::Idle`].
//!
//! [`Conversation::submit`] runs all three in one call.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ai::Gateway;
use crate::attachment::InlineImage;
use crate::parser::{GreedyBraceParser, ResponseParser};
use crate::state::{ChatSnapshot, ChatState, Turn, IMAGE_ONLY_LABEL};

/// Text and image typed but not yet sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    pub text: String,
    pub attachment: Option<InlineImage>,
}

impl Composer {
    /// True when there is nothing worth sending
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }

    pub fn attach(&mut self, image: InlineImage) {
        self.attachment = Some(image);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }
}

/// Everything the gateway needs for one send, captured at submit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message: String,
    pub history: Vec<String>,
    pub image: Option<InlineImage>,
}

impl OutboundMessage {
    pub async fn dispatch(&self, gateway: &dyn Gateway) -> String {
        gateway
            .send(&self.message, &self.history, self.image.as_ref())
            .await
    }
}

pub struct Conversation {
    gateway: Arc<dyn Gateway>,
    parser: Box<dyn ResponseParser>,
    transcript: Vec<Turn>,
    composer: Composer,
    state: ChatState,
}

impl Conversation {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            parser: Box::new(GreedyBraceParser),
            transcript: Vec::new(),
            composer: Composer::default(),
            state: ChatState::Idle,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Seed a fresh conversation with an opening assistant turn
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        if self.transcript.is_empty() {
            self.transcript.push(Turn::assistant(greeting, None));
        }
        self
    }

    pub fn gateway(&self) -> Arc<dyn Gateway> {
        Arc::clone(&self.gateway)
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state == ChatState::Sending
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Only submission is gated on the send state; editing is left to the caller
    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Whether the submit control should be enabled right now
    pub fn can_submit(&self) -> bool {
        !self.is_sending() && !self.composer.is_blank()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            turns: self.transcript.clone(),
            sending: self.is_sending(),
        }
    }

    /// Accept the current draft, or return `None` if it is blank or a send is
    /// already in flight (both are silent no-ops).
    pub fn begin_send(&mut self) -> Option<OutboundMessage> {
        if self.is_sending() {
            debug!("submit ignored: a message is already in flight");
            return None;
        }
        if self.composer.is_blank() {
            return None;
        }

        let draft = std::mem::take(&mut self.composer);
        let trimmed = draft.text.trim();
        let message = if trimmed.is_empty() {
            IMAGE_ONLY_LABEL.to_string()
        } else {
            trimmed.to_string()
        };

        let history = self.transcript.iter().map(Turn::history_line).collect();

        self.transcript
            .push(Turn::user(message.clone(), draft.attachment.clone()));
        self.state = ChatState::Sending;

        Some(OutboundMessage {
            message,
            history,
            image: draft.attachment,
        })
    }

    /// Apply the gateway's reply to the in-flight send.
    ///
    /// Returns false (and changes nothing) when no send is in flight.
    pub fn finish_send(&mut self, raw_reply: &str) -> bool {
        if !self.is_sending() {
            warn!("reply arrived with no message in flight; dropping it");
            return false;
        }

        let reply = self.parser.parse(raw_reply);
        if reply.card.is_some() {
            debug!("contact card extracted from reply");
        }
        self.transcript
            .push(Turn::assistant(reply.display_text, reply.card));
        self.state = ChatState::Idle;
        true
    }

    /// Send the current draft and wait for the assistant turn.
    ///
    /// Returns false when the draft was not accepted.
    pub async fn submit(&mut self) -> bool {
        let Some(outbound) = self.begin_send() else {
            return false;
        };
        let gateway = self.gateway();
        let reply = outbound.dispatch(&*gateway).await;
        self.finish_send(&reply)
    }
}
