use folio_core::{ContactCard, FormField, FormStatus, InlineImage, Speaker, Turn};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, InputMode, Screen};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if close == 0 {
            // "****" carries no text
            spans.push(Span::raw(rest[..open + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }
        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        spans.push(Span::styled(
            after_open[..close].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Terminal columns `chars` occupies (wide glyphs count double)
fn display_width(chars: &[char]) -> usize {
    Span::raw(chars.iter().collect::<String>()).width()
}

/// The slice of a one-line input that fits in `width` columns while keeping
/// the cursor visible, and the cursor's column within it
fn input_window(text: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    if width == 0 {
        return (String::new(), 0);
    }

    let mut start = 0;
    while start < cursor && display_width(&chars[start..cursor]) >= width {
        start += 1;
    }

    let mut end = start;
    while end < chars.len() && display_width(&chars[start..=end]) <= width {
        end += 1;
    }

    let visible = chars[start..end].iter().collect();
    (visible, display_width(&chars[start..cursor]) as u16)
}

/// Rows a line occupies once wrapped to `width` columns
fn wrapped_rows(line: &Line, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    line.width().max(1).div_ceil(width)
}

fn attachment_chip(image: &InlineImage) -> Line<'static> {
    let kb = image.encoded_len().div_ceil(1024);
    Line::from(Span::styled(
        format!(
            "[imagem · {} · {} KB]",
            image.mime_type().unwrap_or("desconhecido"),
            kb
        ),
        Style::default().fg(Color::Magenta),
    ))
}

fn card_lines(card: &ContactCard) -> Vec<Line<'static>> {
    let border = Style::default().fg(Color::Blue);
    let muted = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    let mut header = vec![Span::styled("│ ", border)];
    if let Some(initial) = card.initial() {
        header.push(Span::styled(
            format!("({}) ", initial.to_uppercase()),
            Style::default().fg(Color::Blue).bold(),
        ));
    }
    header.push(Span::styled(card.name.clone(), Style::default().bold()));
    lines.push(Line::from(header));
    if !card.role.is_empty() {
        lines.push(Line::from(vec![Span::styled("│ ", border), Span::raw(card.role.clone())]));
    }
    if let Some(company) = &card.company {
        lines.push(Line::from(vec![
            Span::styled("│ ", border),
            Span::styled(company.clone(), muted),
        ]));
    }

    let contacts = card.contact_lines();
    if !contacts.is_empty() {
        lines.push(Line::from(Span::styled("├──────────", border)));
        for (label, value) in contacts {
            lines.push(Line::from(vec![
                Span::styled("│ ", border),
                Span::styled(format!("{:<9}", label), muted),
                Span::raw(value.to_string()),
            ]));
        }
    }

    if let Some(summary) = &card.summary {
        lines.push(Line::from(vec![
            Span::styled("│ ", border),
            Span::styled(
                format!("\"{}\"", summary),
                Style::default().add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    lines
}

fn turn_lines(turn: &Turn) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match turn.speaker {
        Speaker::User => {
            lines.push(Line::from(Span::styled(
                "Você:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            if let Some(image) = &turn.attachment {
                lines.push(attachment_chip(image));
            }
            lines.extend(turn.display_text.lines().map(|l| Line::from(l.to_string())));
        }
        Speaker::Assistant => {
            lines.push(Line::from(Span::styled(
                "IA:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            lines.extend(turn.display_text.lines().map(parse_markdown_line));
            if let Some(card) = &turn.card {
                lines.extend(card_lines(card));
            }
        }
    }
    lines.push(Line::default());
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Contact => render_contact_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::AttachPath {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", app.title), Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}]", app.model_label), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = match (app.screen, app.input_mode) {
        (_, InputMode::AttachPath) => (" ANEXO ", Style::default().bg(Color::Magenta).fg(Color::White)),
        (Screen::Chat, _) => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        (Screen::Contact, _) => (" CONTATO ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let pairs: &[(&str, &str)] = match (app.screen, app.input_mode) {
        (_, InputMode::AttachPath) => &[(" Enter ", " anexar "), (" Esc ", " cancelar ")],
        (Screen::Chat, _) => &[
            (" Enter ", " enviar "),
            (" ^O ", " imagem "),
            (" ^X ", " remover imagem "),
            (" PgUp/PgDn ", " rolar "),
            (" Tab ", " contato "),
            (" Esc ", " sair "),
        ],
        (Screen::Contact, _) => &[
            (" ↑/↓ ", " campo "),
            (" Enter ", " próximo/enviar "),
            (" Tab ", " chat "),
        ],
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let notice_height = if app.notice.is_some() { 1 } else { 0 };
    let [chat_area, notice_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(notice_height),
        Constraint::Length(3),
    ])
    .areas(area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversa ");

    let mut lines: Vec<Line> = app
        .conversation
        .transcript()
        .iter()
        .flat_map(turn_lines)
        .collect();

    if app.conversation.is_sending() {
        lines.push(Line::from(Span::styled(
            "IA:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Digitando{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    app.chat_height = chat_area.height.saturating_sub(2);
    let inner_width = chat_area.width.saturating_sub(2) as usize;
    let total_rows: usize = lines.iter().map(|l| wrapped_rows(l, inner_width)).sum();
    let max_scroll = total_rows.saturating_sub(app.chat_height as usize) as u16;

    if app.follow_bottom || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_bottom = true;
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(notice) = &app.notice {
        let notice = Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Magenta));
        frame.render_widget(notice, notice_area);
    }

    render_composer(app, frame, input_area);
}

fn render_composer(app: &App, frame: &mut Frame, area: Rect) {
    let composer = app.conversation.composer();
    let sending = app.conversation.is_sending();

    let title = if composer.attachment.is_some() {
        " Adicione um comentário... "
    } else {
        " Digite sua pergunta... "
    };
    let border_color = if sending || app.input_mode == InputMode::AttachPath {
        Color::DarkGray
    } else {
        Color::Yellow
    };

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    if composer.attachment.is_some() {
        block = block.title_bottom(Line::from(" imagem anexada ").right_aligned());
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_window(&composer.text, app.cursor, inner_width);

    let text_color = if sending { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(block);
    frame.render_widget(input, area);

    if !sending && app.input_mode == InputMode::Composing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_contact_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [name_area, email_area, message_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let form = &app.contact;
    let fields = [
        (FormField::Name, &form.fields.name, name_area),
        (FormField::Email, &form.fields.email, email_area),
        (FormField::Message, &form.fields.message, message_area),
    ];

    for (field, value, field_area) in fields {
        let focused = form.focus == field;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::DarkGray }))
            .title(format!(" {} ", field.label()));

        let paragraph = Paragraph::new(value.as_str())
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(paragraph, field_area);

        if focused && form.status() != FormStatus::Submitting {
            let inner_width = field_area.width.saturating_sub(2).max(1);
            let len = value.chars().count() as u16;
            let (row, col) = if field == FormField::Message {
                (len / inner_width, len % inner_width)
            } else {
                (0, len.min(inner_width.saturating_sub(1)))
            };
            frame.set_cursor_position((field_area.x + 1 + col, field_area.y + 1 + row));
        }
    }

    let status = match form.status() {
        FormStatus::Idle => Span::raw(""),
        FormStatus::Submitting => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Span::styled(format!(" Enviando{}", dots), Style::default().fg(Color::DarkGray))
        }
        FormStatus::Success => Span::styled(
            " Mensagem enviada! Obrigado pelo contato.",
            Style::default().fg(Color::Green),
        ),
        FormStatus::Error => Span::styled(
            " Erro ao enviar. Tente novamente.",
            Style::default().fg(Color::Red),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);
    if popup_area.is_empty() {
        return;
    }

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Anexar imagem ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Too short for instructions plus input: show only the input
    let input_row = if inner.height >= 3 {
        let instructions =
            Paragraph::new("Caminho do arquivo. Enter para anexar, Esc para cancelar.")
                .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));
        inner.y + 2
    } else if inner.height >= 1 {
        inner.y
    } else {
        return;
    };

    let input_area = Rect::new(inner.x, input_row, inner.width, 1);
    let cursor = app.attach_input.chars().count();
    let (visible, cursor_x) = input_window(&app.attach_input, cursor, input_area.width as usize);

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_markdown_bold_spans() {
        let line = parse_markdown_line("sou **dev** sênior");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "dev");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a **b");
    }

    #[test]
    fn test_wrapped_rows() {
        assert_eq!(wrapped_rows(&Line::from("abcdef"), 4), 2);
        assert_eq!(wrapped_rows(&Line::default(), 4), 1);
    }

    #[test]
    fn test_card_lines_skip_missing_fields() {
        let card = ContactCard {
            name: "ana".to_string(),
            role: "CEO".to_string(),
            email: Some("ana@acme.com".to_string()),
            ..Default::default()
        };
        let text: Vec<String> = card_lines(&card)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(text[0].contains("(A)"));
        assert!(text.iter().any(|l| l.contains("ana@acme.com")));
        assert!(!text.iter().any(|l| l.contains("phone")));
    }

    #[tokio::test]
    async fn test_render_chat_shows_greeting_and_composer() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Olá!"));
        assert!(text.contains("Digite sua pergunta"));
        assert_eq!(app.chat_height, 20 - 1 - 1 - 3 - 2);
    }

    #[test]
    fn test_input_window_keeps_cursor_visible() {
        assert_eq!(input_window("abc", 3, 10), ("abc".to_string(), 3));
        assert_eq!(input_window("abcdef", 6, 4), ("def".to_string(), 3));
        assert_eq!(input_window("abcdef", 0, 4), ("abcd".to_string(), 0));
    }

    #[test]
    fn test_input_window_counts_wide_glyphs() {
        let (visible, cursor_x) = input_window("日本語", 3, 10);
        assert_eq!(visible, "日本語");
        assert_eq!(cursor_x, 6);

        let (visible, cursor_x) = input_window("日本語", 3, 5);
        assert_eq!(visible, "本語");
        assert_eq!(cursor_x, 4);
    }

    #[tokio::test]
    async fn test_attach_prompt_fits_short_terminal() {
        let mut app = test_app();
        app.open_attach_prompt();
        app.attach_input = "/tmp/cartao.png".to_string();

        for height in [1, 2, 4, 6] {
            let mut terminal = Terminal::new(TestBackend::new(80, height)).unwrap();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }

        let mut terminal = Terminal::new(TestBackend::new(80, 4)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen_text(&terminal).contains("cartao.png"));
    }

    #[tokio::test]
    async fn test_render_contact_screen() {
        let mut app = test_app();
        app.screen = Screen::Contact;
        app.contact.fields.name = "Ana".to_string();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Nome"));
        assert!(text.contains("Mensagem"));
        assert!(text.contains("Ana"));
    }
}
