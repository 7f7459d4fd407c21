//! Talk bar. Shows what the pet can hear and whether it is still answering.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::App;

const KEY_HINTS: &str = "F1 poke, F2 pet, F3 feed, Ctrl-Q quit";

fn title(app: &App) -> String {
    if app.voice_pending {
        format!(" {} is thinking… ", app.pet_name)
    } else if app.voice_enabled {
        format!(" Talk to {} (Enter to send, {}) ", app.pet_name, KEY_HINTS)
    } else {
        format!(" Commands ({}) ", KEY_HINTS)
    }
}

/// Dim text shown while nothing is typed.
fn placeholder(app: &App) -> &'static str {
    if app.voice_pending {
        "waiting for a reply, Enter sends a new one"
    } else if app.voice_enabled {
        "say something, or /click /pet /feed /week"
    } else {
        "voice is off: /click /pet /feed /week /quit"
    }
}

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let border_color = match (app.input_focused, app.voice_pending) {
        (false, _) => Color::DarkGray,
        (true, true) => Color::Yellow,
        (true, false) => Color::Cyan,
    };

    let block = Block::default()
        .title(title(app))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = if app.input.is_empty() {
        Line::styled(placeholder(app), Style::default().fg(Color::DarkGray).italic())
    } else {
        Line::styled(app.input.as_str(), Style::default().fg(Color::White))
    };
    frame.render_widget(Paragraph::new(line), inner);

    if app.input_focused {
        frame.set_cursor_position(Position::new(
            inner.x + app.input.chars().count() as u16,
            inner.y,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_follows_voice_state() {
        let mut app = App::new("Pip", true);
        assert!(title(&app).starts_with(" Talk to Pip"));
        app.voice_pending = true;
        assert_eq!(title(&app), " Pip is thinking… ");

        let quiet = App::new("Pip", false);
        assert!(title(&quiet).starts_with(" Commands"));
        assert!(placeholder(&quiet).starts_with("voice is off"));
    }
}
