//! The assistant's only contact with the generative-AI provider.
//!
//! Two layers: a [`Transport`] that performs one provider call and may fail,
//! and a [`Gateway`] that builds the request from the chat inputs and turns
//! every failure into a fixed reply. Callers of [`Gateway::send`] always get
//! text back.

pub mod gemini;

pub use gemini::GeminiClient;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::attachment::InlineImage;
use crate::profile::Profile;

/// Reply when the provider call failed for any reason
pub const APOLOGY_REPLY: &str =
    "Houve um erro técnico ao consultar minha IA. Por favor, tente novamente mais tarde.";

/// Reply when there was nothing to send
pub const EMPTY_INPUT_REPLY: &str = "Por favor, envie uma mensagem ou uma imagem.";

/// Reply when the provider answered with no text
pub const EMPTY_RESPONSE_REPLY: &str = "Desculpe, não consegui processar sua solicitação.";

/// Mime type assumed for attachments that don't declare an image type
const ASSUMED_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("provider API key not configured")]
    MissingApiKey,
}

/// One part of the single user turn sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    InlineData { mime_type: String, data: String },
    Text(String),
}

/// Provider-neutral request: system instruction plus one user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub parts: Vec<RequestPart>,
}

/// Performs a single request/response exchange with the provider
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GatewayError>;
}

/// Text in, text out. Implementations never fail.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `history` holds prior turns rendered as "speaker: text" lines.
    async fn send(&self, message: &str, history: &[String], image: Option<&InlineImage>) -> String;
}

/// Gateway that speaks as the portfolio subject over a [`Transport`]
#[derive(Clone)]
pub struct AssistantGateway {
    transport: Arc<dyn Transport>,
    profile: Profile,
    include_history: bool,
}

impl AssistantGateway {
    pub fn new(transport: Arc<dyn Transport>, profile: Profile) -> Self {
        Self {
            transport,
            profile,
            include_history: true,
        }
    }

    /// When disabled, prior turns are not passed to the model at all
    pub fn with_history(mut self, include_history: bool) -> Self {
        self.include_history = include_history;
        self
    }

    /// Build the provider request, or `None` when there is nothing to send
    pub fn build_request(
        &self,
        message: &str,
        history: &[String],
        image: Option<&InlineImage>,
    ) -> Option<GenerateRequest> {
        let mut parts = Vec::new();

        if let Some(image) = image {
            let mime_type = image
                .mime_type()
                .filter(|mime| mime.starts_with("image/"))
                .unwrap_or(ASSUMED_IMAGE_MIME);
            parts.push(RequestPart::InlineData {
                mime_type: mime_type.to_string(),
                data: image.base64_payload().to_string(),
            });
        }

        if !message.is_empty() {
            parts.push(RequestPart::Text(message.to_string()));
        }

        if parts.is_empty() {
            return None;
        }

        let history: &[String] = if self.include_history { history } else { &[] };
        Some(GenerateRequest {
            system_instruction: self.profile.system_instruction(history),
            parts,
        })
    }
}

#[async_trait]
impl Gateway for AssistantGateway {
    async fn send(&self, message: &str, history: &[String], image: Option<&InlineImage>) -> String {
        let Some(request) = self.build_request(message, history, image) else {
            return EMPTY_INPUT_REPLY.to_string();
        };

        info!(
            message_len = message.len(),
            history_len = history.len(),
            has_image = image.is_some(),
            "sending chat message"
        );

        match self.transport.generate(&request).await {
            Ok(text) if text.is_empty() => {
                warn!("provider returned an empty reply");
                EMPTY_RESPONSE_REPLY.to_string()
            }
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "error communicating with the AI provider");
                APOLOGY_REPLY.to_string()
            }
        }
    }
}
