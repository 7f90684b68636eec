use chatline_core::{ChatRole, DisplayMode, PROTOCOL_VERSION};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use unicode_width::UnicodeWidthChar;

use crate::app::{App, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next(); // consume second *
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                // Push any accumulated plain text
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
                if found_close {
                    current_text.push_str("**");
                }
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Status line only takes space in history mode when there's something to say
    let status_height = match (app.controller.display_mode(), app.controller.display_text()) {
        (DisplayMode::History, Some(_)) => 1,
        _ => 0,
    };

    // Main layout: header, chat, status, input, footer
    let [header_area, chat_area, status_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(status_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if status_height > 0 {
        render_status(app, frame, status_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" chatline ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("protocol {} | v{}", PROTOCOL_VERSION, env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn role_line(role: ChatRole) -> Line<'static> {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
    };
    Line::from(Span::styled(
        format!("{}:", role.display_name()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing
    app.chat_area = Some(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let controller = &app.controller;
    let title = match controller.display_mode() {
        DisplayMode::History => format!(" Conversation ({}) ", controller.conversation().len()),
        DisplayMode::SingleReply => " Response ".to_string(),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let mut lines: Vec<Line> = Vec::new();

    match controller.display_mode() {
        DisplayMode::History => {
            for msg in controller.conversation().messages() {
                lines.push(role_line(msg.role));
                match msg.role {
                    ChatRole::User => {
                        lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
                    }
                    ChatRole::Assistant => {
                        // Split response into lines and parse markdown
                        lines.extend(msg.content.lines().map(parse_markdown_line));
                    }
                }
                lines.push(Line::default());
            }
        }
        DisplayMode::SingleReply => {
            if let Some(text) = controller.display_text() {
                lines.extend(text.lines().map(parse_markdown_line));
            }
        }
    }

    if controller.is_sending() {
        lines.push(role_line(ChatRole::Assistant));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat_text = if lines.is_empty() {
        Text::from(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let text = app.controller.display_text().unwrap_or_default();
    let status = Paragraph::new(Span::styled(
        format!(" {}", text),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(status, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Message (Enter to send) ");

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_view(app.controller.draft(), app.cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Horizontally scroll the draft so the cursor (a char index) stays visible.
///
/// Returns the visible text and the cursor's column within it. Widths are
/// terminal columns, so wide chars (CJK, emoji) take two.
fn input_view(draft: &str, cursor: usize, inner_width: usize) -> (String, u16) {
    if inner_width == 0 {
        return (String::new(), 0);
    }

    let chars: Vec<char> = draft.chars().collect();
    let cursor = cursor.min(chars.len());
    let width = |c: &char| c.width().unwrap_or(0);

    // Drop chars off the left until the cursor cell fits
    let mut start = 0;
    let mut cursor_col: usize = chars[..cursor].iter().map(width).sum();
    while start < cursor && cursor_col >= inner_width {
        cursor_col -= width(&chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible: String = chars[start..]
        .iter()
        .take_while(|c| {
            used += width(*c);
            used <= inner_width
        })
        .collect();

    (visible, cursor_col.min(u16::MAX as usize) as u16)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
            Span::styled(" Ctrl-C ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::{ChatClient, ChatController, DraftClearPolicy};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn spans_of(line: &Line) -> Vec<(String, bool)> {
        line.spans
            .iter()
            .map(|s| (s.content.to_string(), s.style.add_modifier.contains(Modifier::BOLD)))
            .collect()
    }

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("say **hello** now");
        assert_eq!(
            spans_of(&line),
            vec![
                ("say ".to_string(), false),
                ("hello".to_string(), true),
                (" now".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("2 ** 3");
        assert_eq!(spans_of(&line), vec![("2 ** 3".to_string(), false)]);
    }

    #[test]
    fn test_input_view_scrolls_ascii() {
        assert_eq!(input_view("hello", 5, 10), ("hello".to_string(), 5));
        assert_eq!(input_view("abcdefghij", 10, 5), ("ghij".to_string(), 4));
        assert_eq!(input_view("abcdefghij", 0, 5), ("abcde".to_string(), 0));
    }

    #[test]
    fn test_input_view_counts_wide_chars_as_two_columns() {
        // each CJK char is two columns wide
        assert_eq!(input_view("你好世界", 4, 5), ("世界".to_string(), 4));
        assert_eq!(input_view("ab你好", 2, 4), ("ab你".to_string(), 2));
        assert_eq!(input_view("ab你好", 4, 10), ("ab你好".to_string(), 6));
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_render_shows_conversation_and_status() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let controller = ChatController::new(DraftClearPolicy::OnSuccess, DisplayMode::History);
        let mut app = App::new(ChatClient::new("http://localhost:8080"), controller, tx);

        app.controller.set_draft("hi");
        let first = app.controller.submit().unwrap();
        app.apply_reply(first.id, Ok("hello".to_string()));
        app.controller.set_draft("again");
        let second = app.controller.submit().unwrap();
        app.apply_reply(
            second.id,
            Err(chatline_core::ChatError::Server {
                status: 400,
                message: "Missing prompt".to_string(),
            }),
        );

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("You:"));
        assert!(text.contains("hello"));
        assert!(text.contains("Error: Missing prompt"));
        assert!(text.contains("localhost:8080/chat"));
        assert_eq!(app.chat_width, 58);
    }
}
