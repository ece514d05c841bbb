//! Contact form: visitor messages persisted to a hosted table.
//!
//! The store is Supabase's PostgREST endpoint; the form tracks a four-way
//! submit status that drops back to idle a few seconds after a success.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// How long the success status stays up before the form resets to idle
pub const SUCCESS_RESET_AFTER: Duration = Duration::from_secs(5);

const MESSAGES_TABLE: &str = "messages";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message store is not configured (missing URL or key)")]
    NotConfigured,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("submit interrupted: {0}")]
    Interrupted(String),
}

/// One visitor message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    /// Every field is required; whitespace alone does not count
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.email, &self.message]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Append-only sink for visitor messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &ContactMessage) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }
}

#[async_trait]
impl MessageStore for SupabaseStore {
    async fn insert(&self, message: &ContactMessage) -> Result<(), StoreError> {
        if !self.is_configured() {
            return Err(StoreError::NotConfigured);
        }

        let url = format!("{}/rest/v1/{}", self.url, MESSAGES_TABLE);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(&[message])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Submitting,
    Success,
    Error,
}

/// Which form field has input focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    Email,
    Message,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Email,
            FormField::Email => FormField::Message,
            FormField::Message => FormField::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Nome",
            FormField::Email => "Email",
            FormField::Message => "Mensagem",
        }
    }
}

pub struct ContactForm {
    store: Arc<dyn MessageStore>,
    pub fields: ContactMessage,
    pub focus: FormField,
    status: FormStatus,
    succeeded_at: Option<Instant>,
}

impl ContactForm {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            fields: ContactMessage::default(),
            focus: FormField::default(),
            status: FormStatus::Idle,
            succeeded_at: None,
        }
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.store)
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Name => &mut self.fields.name,
            FormField::Email => &mut self.fields.email,
            FormField::Message => &mut self.fields.message,
        }
    }

    pub fn focused_mut(&mut self) -> &mut String {
        self.field_mut(self.focus)
    }

    /// Whether the submit control should be enabled right now
    pub fn can_submit(&self) -> bool {
        !matches!(self.status, FormStatus::Submitting | FormStatus::Success)
            && self.fields.is_complete()
    }

    /// Move to Submitting and hand back what to insert.
    ///
    /// `None` while a submit is running, while a success is still shown, or
    /// when any field is blank.
    pub fn begin_submit(&mut self) -> Option<ContactMessage> {
        if !self.can_submit() {
            return None;
        }
        self.status = FormStatus::Submitting;
        self.succeeded_at = None;
        Some(self.fields.clone())
    }

    /// Apply the store's answer. Success clears the fields; failure keeps
    /// them so the visitor can resubmit.
    pub fn finish_submit(&mut self, result: Result<(), StoreError>, now: Instant) {
        match result {
            Ok(()) => {
                info!("contact message stored");
                self.fields = ContactMessage::default();
                self.focus = FormField::Name;
                self.status = FormStatus::Success;
                self.succeeded_at = Some(now);
            }
            Err(e) => {
                error!(error = %e, "failed to store contact message");
                self.status = FormStatus::Error;
            }
        }
    }

    pub async fn submit(&mut self) -> FormStatus {
        let Some(message) = self.begin_submit() else {
            return self.status;
        };
        let result = self.store.insert(&message).await;
        self.finish_submit(result, Instant::now());
        self.status
    }

    /// Drop a success status back to idle once it has been shown long enough
    pub fn tick(&mut self, now: Instant) {
        if let (FormStatus::Success, Some(at)) = (self.status, self.succeeded_at) {
            if now.duration_since(at) >= SUCCESS_RESET_AFTER {
                self.status = FormStatus::Idle;
                self.succeeded_at = None;
            }
        }
    }
}
