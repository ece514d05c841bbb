//! Contact-card extraction from free-form model replies
//!
//! The model is asked to answer with a bare `{"cardData": {...}}` object when
//! it was shown a business card, but it does not always comply: the JSON may
//! arrive wrapped in markdown fences or surrounded by prose. Parsing is
//! best-effort and never fails; anything that does not yield a card falls
//! back to showing the raw text.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::state::ContactCard;

/// Display text that replaces the raw reply when a card was extracted
pub const EXTRACTION_LABEL: &str = "Analisei a imagem e extraí os seguintes dados:";

/// What the conversation appends for an assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub display_text: String,
    pub card: Option<ContactCard>,
}

impl ParsedReply {
    fn passthrough(raw: &str) -> Self {
        Self {
            display_text: raw.to_string(),
            card: None,
        }
    }

    fn extracted(card: ContactCard) -> Self {
        Self {
            display_text: EXTRACTION_LABEL.to_string(),
            card: Some(card),
        }
    }
}

/// Turns a raw model reply into display text plus an optional card
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> ParsedReply;
}

/// Which extraction strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Greedy,
    Balanced,
}

impl ParserKind {
    pub fn build(self) -> Box<dyn ResponseParser> {
        match self {
            ParserKind::Greedy => Box::new(GreedyBraceParser),
            ParserKind::Balanced => Box::new(BalancedBraceParser),
        }
    }
}

impl FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greedy" => Ok(ParserKind::Greedy),
            "balanced" => Ok(ParserKind::Balanced),
            other => Err(format!("unknown parser '{}' (expected greedy or balanced)", other)),
        }
    }
}

/// Remove every ```json and ``` marker, wherever it appears, then trim
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn card_from_value(value: &Value) -> Option<ContactCard> {
    let card = value.get("cardData").filter(|v| !v.is_null())?;
    match serde_json::from_value(card.clone()) {
        Ok(card) => Some(card),
        Err(e) => {
            debug!(error = %e, "cardData present but not a valid contact card");
            None
        }
    }
}

/// Leftmost `{` through rightmost `}`, decoded as one JSON value.
///
/// Prose containing several brace groups mis-extracts; that is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyBraceParser;

fn greedy_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

impl ResponseParser for GreedyBraceParser {
    fn parse(&self, raw: &str) -> ParsedReply {
        let cleaned = strip_code_fences(raw);

        let Some(found) = greedy_object().find(&cleaned) else {
            return ParsedReply::passthrough(raw);
        };

        match serde_json::from_str::<Value>(found.as_str()) {
            Ok(value) => match card_from_value(&value) {
                Some(card) => ParsedReply::extracted(card),
                None => ParsedReply::passthrough(raw),
            },
            Err(e) => {
                debug!(error = %e, "reply is not a JSON response");
                ParsedReply::passthrough(raw)
            }
        }
    }
}

/// Tries each balanced `{...}` group in order and takes the first one that
/// decodes to an object carrying `cardData`. Braces inside JSON strings are
/// ignored while scanning.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedBraceParser;

/// Byte length of the balanced group opening at `text[start]`, if it closes
fn balanced_len(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

impl ResponseParser for BalancedBraceParser {
    fn parse(&self, raw: &str) -> ParsedReply {
        let cleaned = strip_code_fences(raw);

        for (start, _) in cleaned.match_indices('{') {
            let Some(len) = balanced_len(&cleaned, start) else {
                continue;
            };
            let candidate = &cleaned[start..start + len];
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                if let Some(card) = card_from_value(&value) {
                    return ParsedReply::extracted(card);
                }
            }
        }

        ParsedReply::passthrough(raw)
    }
}
