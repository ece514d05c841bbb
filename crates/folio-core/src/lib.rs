pub mod ai;
pub mod attachment;
pub mod config;
pub mod contact;
pub mod conversation;
pub mod parser;
pub mod profile;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{AssistantGateway, Gateway, GatewayError, GeminiClient, Transport};
pub use attachment::{strip_data_uri_prefix, AttachmentError, InlineImage};
pub use config::Config;
pub use contact::{ContactForm, ContactMessage, FormField, FormStatus, MessageStore, StoreError, SupabaseStore};
pub use conversation::{Composer, Conversation, OutboundMessage};
pub use parser::{BalancedBraceParser, GreedyBraceParser, ParsedReply, ParserKind, ResponseParser};
pub use profile::Profile;
pub use session::{contact_form_from_config, conversation_from_config};
pub use state::{ChatSnapshot, ChatState, ContactCard, Speaker, Turn};
