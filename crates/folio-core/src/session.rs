//! Build the chat and contact components from a loaded [`Config`]

use std::sync::Arc;

use tracing::warn;

use crate::ai::{AssistantGateway, GeminiClient};
use crate::config::Config;
use crate::contact::{ContactForm, SupabaseStore};
use crate::conversation::Conversation;

/// A greeted conversation talking to Gemini with the configured persona
pub fn conversation_from_config(config: &Config) -> Conversation {
    let api_key = config.gemini_api_key.as_deref().unwrap_or_default();
    if api_key.is_empty() {
        warn!("no Gemini API key configured; every reply will be the error message");
    }

    let transport = GeminiClient::new(api_key, &config.model).with_base_url(&config.gemini_base_url);
    let gateway = AssistantGateway::new(Arc::new(transport), config.profile.clone())
        .with_history(config.include_history);

    Conversation::new(Arc::new(gateway))
        .with_parser(config.parser.build())
        .with_greeting(config.profile.greeting())
}

pub fn contact_form_from_config(config: &Config) -> ContactForm {
    if !config.has_store_credentials() {
        warn!("Supabase credentials missing; contact form submissions will fail");
    }

    let store = SupabaseStore::new(
        config.supabase_url.as_deref().unwrap_or_default(),
        config.supabase_anon_key.as_deref().unwrap_or_default(),
    );
    ContactForm::new(Arc::new(store))
}
