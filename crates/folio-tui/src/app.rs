use std::path::PathBuf;
use std::time::Instant;

use folio_core::ai::APOLOGY_REPLY;
use folio_core::{ContactForm, Conversation, FormStatus, InlineImage, StoreError};
use tokio::task::JoinHandle;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Contact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Typing into the chat composer (or the contact form)
    Composing,
    /// Typing a file path to attach
    AttachPath,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Chat state
    pub conversation: Conversation,
    pub cursor: usize, // char position in the composer text
    pub send_task: Option<JoinHandle<String>>,
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set by the renderer
    pub follow_bottom: bool,
    pub animation_frame: u8,

    // Attach prompt
    pub attach_input: String,
    pub notice: Option<String>,

    // Contact form
    pub contact: ContactForm,
    pub contact_task: Option<JoinHandle<Result<(), StoreError>>>,

    pub title: String,
    pub model_label: String,
}

impl App {
    pub fn new(
        conversation: Conversation,
        contact: ContactForm,
        title: &str,
        model_label: &str,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Chat,
            input_mode: InputMode::Composing,

            conversation,
            cursor: 0,
            send_task: None,
            chat_scroll: 0,
            chat_height: 0,
            follow_bottom: true,
            animation_frame: 0,

            attach_input: String::new(),
            notice: None,

            contact,
            contact_task: None,

            title: title.to_string(),
            model_label: model_label.to_string(),
        }
    }

    /// Keyboard submit: start a send if the draft is accepted
    pub fn submit_chat(&mut self) {
        let Some(outbound) = self.conversation.begin_send() else {
            return;
        };

        self.cursor = 0;
        self.notice = None;
        self.follow_bottom = true;

        let gateway = self.conversation.gateway();
        self.send_task = Some(tokio::spawn(async move {
            outbound.dispatch(&*gateway).await
        }));
    }

    pub fn submit_contact(&mut self) {
        let Some(message) = self.contact.begin_submit() else {
            return;
        };

        let store = self.contact.store();
        self.contact_task = Some(tokio::spawn(async move { store.insert(&message).await }));
    }

    /// Collect finished background work and apply it to the state machines
    pub async fn poll_tasks(&mut self) {
        if self.send_task.as_ref().is_some_and(|task| task.is_finished()) {
            if let Some(task) = self.send_task.take() {
                let reply = match task.await {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(error = %e, "chat send task failed");
                        APOLOGY_REPLY.to_string()
                    }
                };
                self.conversation.finish_send(&reply);
                self.follow_bottom = true;
            }
        }

        if self.contact_task.as_ref().is_some_and(|task| task.is_finished()) {
            if let Some(task) = self.contact_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(StoreError::Interrupted(e.to_string())),
                };
                self.contact.finish_submit(result, Instant::now());
            }
        }

        self.contact.tick(Instant::now());
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_sending() || self.contact.status() == FormStatus::Submitting {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn open_attach_prompt(&mut self) {
        self.attach_input.clear();
        self.input_mode = InputMode::AttachPath;
    }

    pub fn cancel_attach_prompt(&mut self) {
        self.attach_input.clear();
        self.input_mode = InputMode::Composing;
    }

    /// Encode the file named in the attach prompt into the composer
    pub fn confirm_attach_prompt(&mut self) {
        let path = expand_path(&self.attach_input);
        match InlineImage::from_path(&path) {
            Ok(image) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.conversation.composer_mut().attach(image);
                self.notice = Some(format!("Imagem anexada: {}", name));
            }
            Err(e) => {
                self.notice = Some(format!("Não foi possível anexar: {}", e));
            }
        }
        self.cancel_attach_prompt();
    }

    pub fn clear_attachment(&mut self) {
        if self.conversation.composer().attachment.is_some() {
            self.conversation.composer_mut().clear_attachment();
            self.notice = None;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn toggle_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Chat => Screen::Contact,
            Screen::Contact => Screen::Chat,
        };
    }
}

/// Trim quotes a terminal adds around dropped paths and expand a leading `~`
fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}
