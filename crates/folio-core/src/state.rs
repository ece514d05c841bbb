//! UI-agnostic chat state types
//!
//! These are the values a renderer reads out of a [`Conversation`]. They carry
//! no behaviour beyond small display helpers and don't depend on any specific
//! UI framework.
//!
//! [`Conversation`]: crate::conversation::Conversation

use serde::{Deserialize, Serialize};

use crate::attachment::InlineImage;

/// Label shown on a user turn that carried only an image
pub const IMAGE_ONLY_LABEL: &str = "Analisar imagem anexada";

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// Contact data the assistant extracted from an uploaded image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCard {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ContactCard {
    /// First character of the name, used as the avatar glyph
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next()
    }

    /// The optional contact lines that are present, labelled, in display order
    pub fn contact_lines(&self) -> Vec<(&'static str, &str)> {
        [
            ("email", &self.email),
            ("phone", &self.phone),
            ("website", &self.website),
            ("location", &self.location),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<InlineImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<ContactCard>,
}

impl Turn {
    pub fn user(display_text: impl Into<String>, attachment: Option<InlineImage>) -> Self {
        Self {
            speaker: Speaker::User,
            display_text: display_text.into(),
            attachment,
            card: None,
        }
    }

    pub fn assistant(display_text: impl Into<String>, card: Option<ContactCard>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            display_text: display_text.into(),
            attachment: None,
            card,
        }
    }

    /// The "speaker: text" line used when serializing history for the model
    pub fn history_line(&self) -> String {
        format!("{}: {}", self.speaker.as_str(), self.display_text)
    }
}

/// Whether a send is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChatState {
    #[default]
    Idle,
    Sending,
}

/// A point-in-time copy of everything a renderer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    pub turns: Vec<Turn>,
    pub sending: bool,
}
