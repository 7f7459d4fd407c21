//! App state, input handling, pet view.

use codepet_core::controller::AnimationPresenter;
use codepet_core::events::PetEvent;
use codepet_core::stats::WeeklySummary;
use codepet_core::types::*;

/// Lines kept in the chat feed.
const MAX_MESSAGES: usize = 500;

/// A message in the chat feed.
#[derive(Clone)]
pub struct ChatMessage {
    pub side: ChatSide,
    pub text: String,
}

#[derive(Clone, Copy, PartialEq)]
pub enum ChatSide {
    Pet,
    User,
    System,
}

/// What the pet sprite is currently showing.
pub struct PetView {
    pub animation: String,
    pub action: ActionKind,
    pub frame: usize,
    /// Speech the terminal cannot play, shown as a note instead
    pub audio: Option<String>,
    said: Vec<String>,
}

impl PetView {
    fn new() -> Self {
        Self {
            animation: ActionKind::Idle.as_str().to_string(),
            action: ActionKind::Idle,
            frame: 0,
            audio: None,
            said: Vec::new(),
        }
    }

    pub fn advance(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }
}

impl AnimationPresenter for PetView {
    fn play(&mut self, animation: &str, action: &ActionEvent) {
        self.animation = animation.to_string();
        self.action = action.kind;
        self.frame = 0;
        self.audio = action
            .audio
            .as_ref()
            .map(|a| a.0.display().to_string());
        if let Some(message) = &action.message {
            self.said.push(message.clone());
        }
    }
}

/// The main application state.
pub struct App {
    pub pet_name: String,
    pub pet: PetView,
    pub mood: MoodState,
    pub reacting: bool,
    pub totals: DailyTotals,
    pub streak: StreakInfo,
    pub goal_progress: f64,
    pub day_keystrokes: u64,
    pub voice_enabled: bool,
    pub voice_pending: bool,
    pub messages: Vec<ChatMessage>,
    pub scroll_offset: usize,
    pub input: String,
    pub input_focused: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(pet_name: &str, voice_enabled: bool) -> Self {
        App {
            pet_name: pet_name.to_string(),
            pet: PetView::new(),
            mood: MoodState::Idle,
            reacting: false,
            totals: DailyTotals::default(),
            streak: StreakInfo::default(),
            goal_progress: 0.0,
            day_keystrokes: 0,
            voice_enabled,
            voice_pending: false,
            messages: Vec::new(),
            scroll_offset: 0,
            input: String::new(),
            input_focused: true,
            should_quit: false,
        }
    }

    pub fn push_message(&mut self, side: ChatSide, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            side,
            text: text.into(),
        });
        if self.messages.len() > MAX_MESSAGES {
            let excess = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(..excess);
        }
        // Auto-scroll to bottom
        self.scroll_offset = 0;
    }

    /// Move anything the pet said since the last call into the chat feed.
    pub fn collect_speech(&mut self) {
        let said = std::mem::take(&mut self.pet.said);
        for line in said {
            self.push_message(ChatSide::Pet, line);
        }
    }

    /// Handle a controller event.
    pub fn handle_event(&mut self, event: PetEvent) {
        match event {
            PetEvent::Mood { current, .. } => {
                self.mood = current;
            }
            PetEvent::Reacting { active } => {
                self.reacting = active;
            }
            PetEvent::Action { action, .. } => {
                match action.kind {
                    ActionKind::Speak => self.voice_pending = false,
                    ActionKind::Unavailable => {
                        self.voice_pending = false;
                        self.push_message(ChatSide::System, "(no answer this time)");
                    }
                    _ => {}
                }
            }
            // The celebration action carries the message; main persists the id
            PetEvent::Achievement { .. } => {}
            PetEvent::Dropped { reason } => {
                self.push_message(ChatSide::System, format!("dropped: {}", reason));
            }
            PetEvent::Stats {
                totals,
                streak,
                goal_progress,
            } => {
                self.totals = totals;
                self.streak = streak;
                self.goal_progress = goal_progress;
            }
        }
    }

    /// Print the last seven days into the chat feed.
    pub fn show_weekly(&mut self, summary: &WeeklySummary) {
        self.push_message(
            ChatSide::System,
            format!(
                "week {} to {}: {}h{:02}m coding, {} keys, {} active day(s), goal met {}x",
                summary.from.format("%m-%d"),
                summary.to.format("%m-%d"),
                summary.total_seconds / 3600,
                summary.total_seconds % 3600 / 60,
                summary.total_keystrokes,
                summary.active_days,
                summary.goals_met
            ),
        );
        for day in &summary.days {
            let mut line = format!(
                "  {} {:>4}m {:>6} keys",
                day.date.format("%a"),
                day.totals.total_seconds / 60,
                day.totals.total_keystrokes
            );
            if day.goals_met {
                line.push_str("  goal");
            }
            if !day.achievements.is_empty() {
                line.push_str(&format!("  +{}", day.achievements.join(", ")));
            }
            self.push_message(ChatSide::System, line);
        }
    }

    /// Take the typed line, echoing it into the chat feed.
    pub fn take_input(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        self.input.clear();
        if text.is_empty() {
            return None;
        }
        if !text.starts_with('/') {
            self.push_message(ChatSide::User, format!("You: {}", text));
        }
        Some(text)
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}
