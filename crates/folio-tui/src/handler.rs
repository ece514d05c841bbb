use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use folio_core::FormField;

use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

const WHEEL: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_tasks().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.input_mode == InputMode::AttachPath {
        handle_attach_prompt(app, key);
        return;
    }

    match app.screen {
        Screen::Chat => handle_chat(app, key),
        Screen::Contact => handle_contact(app, key),
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab => app.toggle_screen(),
        KeyCode::Enter => app.submit_chat(),

        KeyCode::Char('o') if ctrl => {
            if !app.conversation.is_sending() {
                app.open_attach_prompt();
            }
        }
        KeyCode::Char('x') if ctrl => app.clear_attachment(),

        KeyCode::PageUp => app.scroll_up(page_size(app)),
        KeyCode::PageDown => app.scroll_down(page_size(app)),
        KeyCode::Up if ctrl => app.scroll_up(1),
        KeyCode::Down if ctrl => app.scroll_down(1),

        _ => {
            // The composer is locked for the whole send
            if !app.conversation.is_sending() {
                edit_composer(app, key);
            }
        }
    }
}

fn page_size(app: &App) -> u16 {
    app.chat_height.saturating_sub(1).max(1)
}

fn edit_composer(app: &mut App, key: KeyEvent) {
    let cursor = &mut app.cursor;
    let text = &mut app.conversation.composer_mut().text;

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => {
            *cursor = text.chars().count();
            app.follow_bottom = true;
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_attach_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_attach_prompt(),
        KeyCode::Enter => {
            if app.attach_input.trim().is_empty() {
                app.cancel_attach_prompt();
            } else {
                app.confirm_attach_prompt();
            }
        }
        KeyCode::Backspace => {
            app.attach_input.pop();
        }
        KeyCode::Char(c) => app.attach_input.push(c),
        _ => {}
    }
}

fn handle_contact(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.toggle_screen(),
        KeyCode::Down => app.contact.focus = app.contact.focus.next(),
        KeyCode::Up => app.contact.focus = app.contact.focus.next().next(),
        KeyCode::Enter => {
            if app.contact.focus == FormField::Message {
                app.submit_contact();
            } else {
                app.contact.focus = app.contact.focus.next();
            }
        }
        KeyCode::Backspace => {
            app.contact.focused_mut().pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.contact.focused_mut().push(c);
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode == InputMode::AttachPath {
        app.attach_input.push_str(text.trim());
        return;
    }

    match app.screen {
        Screen::Chat => {
            if app.conversation.is_sending() {
                return;
            }
            let flat: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
            let composer = &mut app.conversation.composer_mut().text;
            let byte_pos = char_to_byte_index(composer, app.cursor);
            composer.insert_str(byte_pos, &flat);
            app.cursor += flat.chars().count();
        }
        Screen::Contact => app.contact.focused_mut().push_str(text),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL),
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use folio_core::FormStatus;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    async fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = test_app();
        handle_event(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_editing_is_utf8_safe() {
        let mut app = test_app();
        type_str(&mut app, "olá").await;
        handle_event(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.conversation.composer().text, "oá");
        assert_eq!(app.cursor, 1);

        handle_event(&mut app, key(KeyCode::Delete)).await.unwrap();
        assert_eq!(app.conversation.composer().text, "o");
    }

    #[tokio::test]
    async fn test_enter_sends_and_locks_composer() {
        let mut app = test_app();
        type_str(&mut app, "oi").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert!(app.conversation.is_sending());
        assert!(app.conversation.composer().text.is_empty());

        type_str(&mut app, "mais").await;
        assert!(app.conversation.composer().text.is_empty());

        while app.send_task.is_some() {
            tokio::task::yield_now().await;
            handle_event(&mut app, AppEvent::Tick).await.unwrap();
        }
        assert!(!app.conversation.is_sending());
        assert_eq!(app.conversation.transcript().last().unwrap().display_text, "eco: oi");
    }

    #[tokio::test]
    async fn test_attach_prompt_keys() {
        let mut app = test_app();
        handle_event(&mut app, ctrl('o')).await.unwrap();
        assert_eq!(app.input_mode, InputMode::AttachPath);

        type_str(&mut app, "/tmp").await;
        assert_eq!(app.attach_input, "/tmp");
        assert!(app.conversation.composer().text.is_empty());

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Composing);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_paste_flattens_newlines() {
        let mut app = test_app();
        handle_event(&mut app, AppEvent::Paste("a\nb".to_string())).await.unwrap();
        assert_eq!(app.conversation.composer().text, "a b");
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn test_contact_form_keys() {
        let mut app = test_app();
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.screen, Screen::Contact);

        type_str(&mut app, "Ana").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        type_str(&mut app, "ana@acme.com").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        type_str(&mut app, "Oi").await;
        assert_eq!(app.contact.fields.name, "Ana");
        assert_eq!(app.contact.fields.email, "ana@acme.com");
        assert_eq!(app.contact.focus, FormField::Message);

        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.contact.status(), FormStatus::Submitting);

        while app.contact_task.is_some() {
            tokio::task::yield_now().await;
            handle_event(&mut app, AppEvent::Tick).await.unwrap();
        }
        assert_eq!(app.contact.status(), FormStatus::Success);

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.screen, Screen::Chat);
    }

    #[tokio::test]
    async fn test_scroll_keys_stop_following() {
        let mut app = test_app();
        app.chat_height = 11;
        handle_event(&mut app, key(KeyCode::PageDown)).await.unwrap();
        assert!(!app.follow_bottom);
        assert_eq!(app.chat_scroll, 10);

        handle_event(&mut app, key(KeyCode::End)).await.unwrap();
        assert!(app.follow_bottom);
    }
}
