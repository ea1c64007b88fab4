use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use agent_chat::{Message, Role};

use crate::app::App;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Agent Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Role::Agent => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

fn message_lines(message: &Message) -> Vec<Line<'_>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("{}:", message.role.label()),
        role_style(message.role),
    ))];

    // Text is shown as-is, never parsed for markup
    if message.text.is_empty() {
        lines.push(Line::default());
    } else {
        lines.extend(message.text.split('\n').map(Line::raw));
    }
    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let in_flight = app.widget.is_in_flight();
    let mut lines: Vec<Line> = Vec::new();

    if app.widget.messages().is_empty() && !in_flight {
        lines.push(Line::from(Span::styled(
            "Type a message below and press Enter...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for message in app.widget.messages() {
        lines.extend(message_lines(message));
    }

    if in_flight {
        lines.push(Line::from(Span::styled("Agent:", role_style(Role::Agent))));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Measured with the same word wrapping the render uses, so the newest
    // line stays in view unless the user has scrolled up
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(inner_height);
    let from_bottom = app.widget.message_list().scroll_from_bottom().min(max_scroll);
    let top = max_scroll - from_bottom;

    let chat = chat.block(chat_block).scroll((top, 0));

    frame.render_widget(chat, area);
    app.widget.message_list_mut().clamp_scroll(max_scroll);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input = app.widget.input();
    let enabled = input.is_enabled();

    let (border_color, title) = if enabled {
        (Color::Yellow, " Message (Enter to send) ")
    } else {
        (Color::DarkGray, " Waiting for reply... ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(input.value(), input.cursor(), inner_width);

    let text_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let paragraph = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(paragraph, area);

    if enabled && input.is_focused() {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// The part of `value` that fits in `width` columns with the cursor in view,
/// and the cursor's column within it. Columns are display width, so wide
/// characters count double.
fn visible_input(value: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = value.chars().collect();
    let cursor = cursor.min(chars.len());
    let char_width = |c: &char| c.width().unwrap_or(0);

    let mut start = 0;
    let mut before: usize = chars[..cursor].iter().map(char_width).sum();
    while start < cursor && before >= width {
        before -= char_width(&chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible = chars[start..]
        .iter()
        .take_while(|c| {
            used += char_width(*c);
            used <= width
        })
        .collect();

    (visible, u16::try_from(before).unwrap_or(u16::MAX))
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Black).bg(Color::Gray);
    let footer = Line::from(vec![
        Span::styled(" Enter ", key_style),
        Span::raw(" send  "),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::raw(" scroll  "),
        Span::styled(" Esc ", key_style),
        Span::raw(" quit  "),
        Span::styled(
            format!("{} messages", app.widget.messages().len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}
