//! Inbound `ExternalEvent`s (plugins, voice, user) and outbound `PetEvent`s
//! broadcast from the controller to frontends via tokio::broadcast.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    priority, ActionEvent, ActionKind, AudioHandle, DailyTotals, MoodState, StreakInfo,
};

/// Identifies one voice-interaction round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    Pet,
    Feed,
}

/// Events arriving at the controller from outside the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExternalEvent {
    AchievementUnlocked { id: String, name: String },
    GoalReached { hours: f64 },
    Interaction { interaction: InteractionKind },
    RestReminder { active_minutes: u64 },
    VoiceReply {
        session_id: SessionId,
        text: String,
        #[serde(default)]
        audio: Option<AudioHandle>,
    },
    VoiceFailed { session_id: SessionId, reason: String },
}

impl ExternalEvent {
    /// Parse an event from its JSON form. Unknown kinds and garbled payloads
    /// come back as the parse error so the caller can log and drop them.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExternalEvent::AchievementUnlocked { .. } => "achievement_unlocked",
            ExternalEvent::GoalReached { .. } => "goal_reached",
            ExternalEvent::Interaction { .. } => "interaction",
            ExternalEvent::RestReminder { .. } => "rest_reminder",
            ExternalEvent::VoiceReply { .. } => "voice_reply",
            ExternalEvent::VoiceFailed { .. } => "voice_failed",
        }
    }

    /// Session the event belongs to, for voice results only.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            ExternalEvent::VoiceReply { session_id, .. }
            | ExternalEvent::VoiceFailed { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }

    /// The action this event asks the pet to play.
    pub fn to_action(&self) -> ActionEvent {
        match self {
            ExternalEvent::AchievementUnlocked { name, .. } => {
                ActionEvent::external(ActionKind::Celebrate, priority::ACHIEVEMENT)
                    .with_message(format!("Achievement unlocked: {}", name))
            }
            ExternalEvent::GoalReached { hours } => {
                ActionEvent::external(ActionKind::Celebrate, priority::GOAL_REACHED)
                    .with_message(format!("Daily goal of {} hours reached!", hours))
            }
            ExternalEvent::Interaction { interaction } => {
                let kind = match interaction {
                    InteractionKind::Click => ActionKind::React,
                    InteractionKind::Pet => ActionKind::Happy,
                    InteractionKind::Feed => ActionKind::Eat,
                };
                ActionEvent::external(kind, priority::INTERACTION)
            }
            ExternalEvent::RestReminder { active_minutes } => {
                ActionEvent::external(ActionKind::Rest, priority::REST_REMINDER).with_message(
                    format!(
                        "You've been at it for {} minutes. Time to stretch!",
                        active_minutes
                    ),
                )
            }
            ExternalEvent::VoiceReply { text, audio, .. } => {
                ActionEvent::external(ActionKind::Speak, priority::VOICE_REPLY)
                    .with_message(text.clone())
                    .with_audio(audio.clone())
            }
            ExternalEvent::VoiceFailed { .. } => {
                ActionEvent::external(ActionKind::Unavailable, priority::UNAVAILABLE)
            }
        }
    }
}

/// Events broadcast from the controller to all subscribers (TUI, loggers).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PetEvent {
    /// An action was handed to the presenter
    #[serde(rename = "action")]
    Action { name: String, action: ActionEvent },

    /// The derived mood changed
    #[serde(rename = "mood")]
    Mood {
        previous: MoodState,
        current: MoodState,
    },

    /// Reacting overlay started or ended
    #[serde(rename = "reacting")]
    Reacting { active: bool },

    /// An inbound event was discarded
    #[serde(rename = "dropped")]
    Dropped { reason: String },

    /// A plugin unlocked an achievement; frontends persist it
    #[serde(rename = "achievement")]
    Achievement { id: String, name: String },

    /// Today's totals after a stats flush
    #[serde(rename = "stats")]
    Stats {
        totals: DailyTotals,
        streak: StreakInfo,
        goal_progress: f64,
    },
}

impl PetEvent {
    /// Serialize to `{"event": "...", "data": {...}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_event() {
        let event =
            ExternalEvent::from_json(json!({"kind": "interaction", "interaction": "feed"})).unwrap();
        assert_eq!(
            event,
            ExternalEvent::Interaction {
                interaction: InteractionKind::Feed
            }
        );
        assert_eq!(event.to_action().kind, ActionKind::Eat);
    }

    #[test]
    fn test_parse_unknown_kind_fails() {
        assert!(ExternalEvent::from_json(json!({"kind": "github_stars", "count": 3})).is_err());
        assert!(ExternalEvent::from_json(json!({"kind": "interaction", "interaction": "tickle"}))
            .is_err());
        assert!(ExternalEvent::from_json(json!("garbage")).is_err());
    }

    #[test]
    fn test_voice_failure_is_lowest_priority() {
        let failed = ExternalEvent::VoiceFailed {
            session_id: SessionId::new(),
            reason: "timeout".into(),
        }
        .to_action();
        assert_eq!(failed.kind, ActionKind::Unavailable);
        assert!(failed.priority < MoodState::Idle.priority());
    }

    #[test]
    fn test_voice_reply_carries_text() {
        let id = SessionId::new();
        let event = ExternalEvent::VoiceReply {
            session_id: id,
            text: "hello!".into(),
            audio: None,
        };
        assert_eq!(event.session_id(), Some(id));
        let action = event.to_action();
        assert_eq!(action.kind, ActionKind::Speak);
        assert_eq!(action.message.as_deref(), Some("hello!"));
    }

    #[test]
    fn test_voice_reply_from_wire() {
        let id = "6f1c2b8e-3d4a-4c5b-9e7f-0a1b2c3d4e5f";
        let event = ExternalEvent::from_json(json!({
            "kind": "voice_reply",
            "session_id": id,
            "text": "hi there",
            "audio": null,
        }))
        .unwrap();
        assert_eq!(event.session_id().map(|s| s.0.to_string()).as_deref(), Some(id));
        assert_eq!(serde_json::to_value(&event).unwrap()["session_id"], id);
    }

    #[test]
    fn test_pet_event_json_shape() {
        let value = PetEvent::Reacting { active: true }.to_json();
        assert_eq!(value["event"], "reacting");
        assert_eq!(value["data"]["active"], true);
    }
}
