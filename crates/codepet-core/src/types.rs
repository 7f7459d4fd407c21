//! Core types: ActivitySample, MoodState, ActionKind, ActionEvent, DailyTotals, etc.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── Activity ──

/// One polling tick worth of activity. Immutable once sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    /// Local wall-clock time of the tick
    pub timestamp: NaiveDateTime,
    pub tool_active: bool,
    pub keystroke_delta: u64,
}

impl ActivitySample {
    pub fn new(timestamp: NaiveDateTime, tool_active: bool, keystroke_delta: u64) -> Self {
        Self {
            timestamp,
            tool_active,
            keystroke_delta,
        }
    }

    /// A tick where nothing could be observed.
    pub fn inactive(timestamp: NaiveDateTime) -> Self {
        Self::new(timestamp, false, 0)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

// ── Mood ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodState {
    Idle,
    Happy,
    Sleepy,
    Encouraging,
    Celebrating,
}

impl MoodState {
    /// The action the pet plays while in this mood.
    pub fn default_action(self) -> ActionKind {
        match self {
            MoodState::Idle => ActionKind::Idle,
            MoodState::Happy => ActionKind::Happy,
            MoodState::Sleepy => ActionKind::Sleep,
            MoodState::Encouraging => ActionKind::Encourage,
            MoodState::Celebrating => ActionKind::Celebrate,
        }
    }

    /// Queue priority of the mood's action. Mirrors the mood tie-break order.
    pub fn priority(self) -> i32 {
        match self {
            MoodState::Idle => priority::MOOD_IDLE,
            MoodState::Happy => priority::MOOD_HAPPY,
            MoodState::Encouraging => priority::MOOD_ENCOURAGING,
            MoodState::Sleepy => priority::MOOD_SLEEPY,
            MoodState::Celebrating => priority::MOOD_CELEBRATING,
        }
    }
}

impl std::fmt::Display for MoodState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoodState::Idle => write!(f, "idle"),
            MoodState::Happy => write!(f, "happy"),
            MoodState::Sleepy => write!(f, "sleepy"),
            MoodState::Encouraging => write!(f, "encouraging"),
            MoodState::Celebrating => write!(f, "celebrating"),
        }
    }
}

// ── Actions ──

/// Everything the presenter can be asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Idle,
    Happy,
    Sleep,
    Encourage,
    Celebrate,
    React,
    Eat,
    Rest,
    Speak,
    Unavailable,
}

impl ActionKind {
    pub const ALL: &'static [ActionKind] = &[
        ActionKind::Idle,
        ActionKind::Happy,
        ActionKind::Sleep,
        ActionKind::Encourage,
        ActionKind::Celebrate,
        ActionKind::React,
        ActionKind::Eat,
        ActionKind::Rest,
        ActionKind::Speak,
        ActionKind::Unavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Idle => "idle",
            ActionKind::Happy => "happy",
            ActionKind::Sleep => "sleep",
            ActionKind::Encourage => "encourage",
            ActionKind::Celebrate => "celebrate",
            ActionKind::React => "react",
            ActionKind::Eat => "eat",
            ActionKind::Rest => "rest",
            ActionKind::Speak => "speak",
            ActionKind::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue priorities. Higher wins.
pub mod priority {
    pub const UNAVAILABLE: i32 = 0;
    pub const MOOD_IDLE: i32 = 10;
    pub const MOOD_HAPPY: i32 = 20;
    pub const MOOD_ENCOURAGING: i32 = 30;
    pub const MOOD_SLEEPY: i32 = 40;
    pub const MOOD_CELEBRATING: i32 = 50;
    pub const INTERACTION: i32 = 60;
    pub const REST_REMINDER: i32 = 65;
    pub const VOICE_REPLY: i32 = 70;
    pub const GOAL_REACHED: i32 = 75;
    pub const ACHIEVEMENT: i32 = 80;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOrigin {
    /// Issued because the derived mood changed
    Mood,
    /// Issued for an external event (plugin, voice, user)
    External,
}

/// Opaque reference to synthesized speech the presenter may play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHandle(pub PathBuf);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub kind: ActionKind,
    pub priority: i32,
    pub origin: ActionOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioHandle>,
}

impl ActionEvent {
    pub fn for_mood(mood: MoodState) -> Self {
        Self {
            kind: mood.default_action(),
            priority: mood.priority(),
            origin: ActionOrigin::Mood,
            message: None,
            audio: None,
        }
    }

    pub fn external(kind: ActionKind, priority: i32) -> Self {
        Self {
            kind,
            priority,
            origin: ActionOrigin::External,
            message: None,
            audio: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_audio(mut self, audio: Option<AudioHandle>) -> Self {
        self.audio = audio;
        self
    }

    pub fn is_external(&self) -> bool {
        self.origin == ActionOrigin::External
    }
}

// ── Stats ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub total_seconds: u64,
    pub total_keystrokes: u64,
}

impl DailyTotals {
    pub fn has_activity(&self) -> bool {
        self.total_seconds > 0 || self.total_keystrokes > 0
    }
}

/// One stored line of the stats file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: DailyTotals,
    /// The daily goal was reached on this date
    #[serde(default)]
    pub goals_met: bool,
    /// Ids of achievements unlocked on this date
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub achievements: Vec<String>,
}

impl DayRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            totals: DailyTotals::default(),
            goals_met: false,
            achievements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    pub current: u32,
    pub longest: u32,
}

// ── Personality ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Cheerful,
    Shy,
    Quirky,
}

impl std::fmt::Display for Personality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Personality::Cheerful => write!(f, "cheerful"),
            Personality::Shy => write!(f, "shy"),
            Personality::Quirky => write!(f, "quirky"),
        }
    }
}
