//! ASCII pet sprite. Each action has a short looping animation.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use codepet_core::types::{ActionKind, MoodState};
use crate::app::App;

/// Draw-loop iterations per sprite frame.
const TICKS_PER_FRAME: usize = 10;

type Sprite = [&'static str; 5];

fn frames(action: ActionKind) -> &'static [Sprite] {
    match action {
        ActionKind::Idle => &[
            ["  /\\_/\\  ", " ( o.o ) ", "  > ^ <  ", " /     \\ ", "(__|_|__)"],
            ["  /\\_/\\  ", " ( -.- ) ", "  > ^ <  ", " /     \\ ", "(__|_|__)"],
        ],
        ActionKind::Happy => &[
            ["  /\\_/\\  ", " ( ^.^ ) ", "  > w <  ", " /     \\ ", "(__|_|__)"],
            ["  /\\_/\\ ~", " ( ^o^ ) ", "  > w <  ", " \\     / ", "(__|_|__)"],
        ],
        ActionKind::Sleep | ActionKind::Rest => &[
            ["  /\\_/\\ z", " ( -.- ) ", "  > ~ <  ", " /     \\ ", "(_______)"],
            ["  /\\_/\\ Z", " ( -.- ) ", "  > ~ <  ", " /     \\ ", "(_______)"],
        ],
        ActionKind::Encourage => &[
            ["  /\\_/\\  ", " ( >.< ) ", " \\> ^ <  ", "  |    \\ ", "(__|_|__)"],
            ["  /\\_/\\  ", " ( >o< ) ", "  > ^ </ ", " /    |  ", "(__|_|__)"],
        ],
        ActionKind::Celebrate => &[
            ["* /\\_/\\ *", " ( ^O^ ) ", "\\> ^ </ ", "  |   |  ", "(__|_|__)"],
            [" */\\_/\\* ", "*( ^O^ )*", " /> ^ <\\ ", "  |   |  ", "(__|_|__)"],
        ],
        ActionKind::React => &[
            ["  /\\_/\\ !", " ( O.O ) ", "  > ^ <  ", " /     \\ ", "(__|_|__)"],
            ["  /\\_/\\  ", " ( o.O ) ", "  > ^ <  ", " /     \\ ", "(__|_|__)"],
        ],
        ActionKind::Eat => &[
            ["  /\\_/\\  ", " ( ^.^ ) ", "  > o < @", " /     \\ ", "(__|_|__)"],
            ["  /\\_/\\  ", " ( ^~^ ) ", "  > - <  ", " /     \\ ", "(__|_|__)"],
        ],
        ActionKind::Speak => &[
            ["  /\\_/\\  ", " ( o.o ) ", "  > O <  ", " /     \\ ", "(__|_|__)"],
            ["  /\\_/\\  ", " ( o.o ) ", "  > o <  ", " /     \\ ", "(__|_|__)"],
        ],
        ActionKind::Unavailable => &[
            ["  /\\_/\\ ?", " ( ._. ) ", "  > - <  ", " /     \\ ", "(__|_|__)"],
        ],
    }
}

fn mood_color(mood: MoodState) -> Color {
    match mood {
        MoodState::Idle => Color::Gray,
        MoodState::Happy => Color::Green,
        MoodState::Sleepy => Color::Blue,
        MoodState::Encouraging => Color::Yellow,
        MoodState::Celebrating => Color::Magenta,
    }
}

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", app.pet_name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sprites = frames(app.pet.action);
    let sprite = &sprites[(app.pet.frame / TICKS_PER_FRAME) % sprites.len()];
    let style = Style::default().fg(mood_color(app.mood)).bold();

    let mut lines: Vec<Line> = vec![Line::raw("")];
    for row in sprite {
        lines.push(Line::styled(format!("       {}", row), style));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        format!(" {}", app.pet.animation),
        Style::default().fg(Color::Cyan).italic(),
    ));
    if let Some(audio) = &app.pet.audio {
        lines.push(Line::styled(
            format!(" ♪ {}", audio),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, inner);
}
