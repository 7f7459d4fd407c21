//! Scrollable chat feed: pet lines, user utterances, system notes.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{App, ChatSide};

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Chat ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.messages.is_empty() {
        let empty = Paragraph::new("Say hi to your pet...")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    // Build display lines from messages (bottom-up with scroll offset)
    let visible_height = inner.height as usize;
    let total = app.messages.len();
    let end = total.saturating_sub(app.scroll_offset);
    let start = end.saturating_sub(visible_height);

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.messages[start..end] {
        let (fg, prefix) = match msg.side {
            ChatSide::Pet => (Color::Green, format!("{}: ", app.pet_name)),
            ChatSide::User => (Color::Yellow, String::new()),
            ChatSide::System => (Color::DarkGray, "  ".to_string()),
        };
        lines.push(Line::styled(
            format!("{}{}", prefix, msg.text),
            Style::default().fg(fg),
        ));
    }
    if app.voice_pending {
        lines.push(Line::styled(
            format!("{} is thinking...", app.pet_name),
            Style::default().fg(Color::DarkGray).italic(),
        ));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
}
