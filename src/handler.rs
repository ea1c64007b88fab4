use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    let page = app
        .chat_area
        .map(|area| area.height.saturating_sub(2).max(1))
        .unwrap_or(10);

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.widget.input_mut().backspace(),
        KeyCode::Delete => app.widget.input_mut().delete(),
        KeyCode::Left => app.widget.input_mut().move_left(),
        KeyCode::Right => app.widget.input_mut().move_right(),
        KeyCode::Home => app.widget.input_mut().move_home(),
        KeyCode::End => app.widget.input_mut().move_end(),
        KeyCode::Up => app.widget.message_list_mut().scroll_up(1),
        KeyCode::Down => app.widget.message_list_mut().scroll_down(1),
        KeyCode::PageUp => app.widget.message_list_mut().scroll_up(page),
        KeyCode::PageDown => app.widget.message_list_mut().scroll_down(page),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.widget.input_mut().insert_char(c)
        }
        _ => {}
    }
}

/// Pasted text goes into the single-line input with line breaks flattened
fn handle_paste(app: &mut App, text: &str) {
    let input = app.widget.input_mut();
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' | '\t' => input.insert_char(' '),
            c => input.insert_char(c),
        }
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let over_chat = app
        .chat_area
        .is_some_and(|area| point_in_rect(mouse.column, mouse.row, area));
    if !over_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.widget.message_list_mut().scroll_up(WHEEL_LINES),
        MouseEventKind::ScrollDown => app.widget.message_list_mut().scroll_down(WHEEL_LINES),
        _ => {}
    }
}
