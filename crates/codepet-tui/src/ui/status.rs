//! Status bar: mood, current action, today's progress.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use codepet_core::types::MoodState;
use crate::app::App;

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let mood_color = match app.mood {
        MoodState::Idle => Color::DarkGray,
        MoodState::Happy => Color::Green,
        MoodState::Sleepy => Color::Blue,
        MoodState::Encouraging => Color::Yellow,
        MoodState::Celebrating => Color::Magenta,
    };

    let minutes = app.totals.total_seconds / 60;
    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.mood),
            Style::default().fg(Color::Black).bg(mood_color),
        ),
        Span::raw(format!(" {} ", app.pet.action)),
        Span::raw(format!(
            " keys: {}  time: {}h{:02}m  goal: {:.0}% ",
            app.day_keystrokes,
            minutes / 60,
            minutes % 60,
            (app.goal_progress * 100.0).min(999.0)
        )),
        Span::styled(
            format!(" streak: {}d (best {}d) ", app.streak.current, app.streak.longest),
            Style::default().fg(Color::Cyan),
        ),
    ];

    if app.reacting {
        spans.push(Span::styled(" reacting ", Style::default().fg(Color::Yellow)));
    }
    if !app.voice_enabled {
        spans.push(Span::styled(" voice off ", Style::default().fg(Color::DarkGray)));
    }

    let status = Paragraph::new(Line::from(spans));
    frame.render_widget(status, area);
}
