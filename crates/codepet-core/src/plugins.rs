//! Plugins: small behaviors that watch ticks and events and ask the
//! controller to react. A plugin never touches controller state; it only
//! returns events for the queue.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::config::Config;
use crate::events::ExternalEvent;
use crate::types::{ActivitySample, DayRecord};

/// Gaps longer than this (suspend, stalled loop) are not counted as activity.
const MAX_TICK_GAP_SECS: i64 = 60;

pub trait PetPlugin: Send {
    fn name(&self) -> &str;

    fn on_tick(&mut self, sample: &ActivitySample) -> Vec<ExternalEvent>;

    fn on_event(&mut self, _event: &ExternalEvent) -> Vec<ExternalEvent> {
        Vec::new()
    }
}

/// Plugins enabled in the config. `today` seeds per-day progress from stored stats.
pub fn from_config(config: &Config, today: Option<&DayRecord>) -> Vec<Box<dyn PetPlugin>> {
    let mut plugins: Vec<Box<dyn PetPlugin>> = Vec::new();
    if config.achievements_enabled {
        let plugin = match today {
            Some(record) => AchievementPlugin::resume(record),
            None => AchievementPlugin::new(),
        };
        plugins.push(Box::new(plugin));
    }
    if config.pomodoro_enabled {
        plugins.push(Box::new(PomodoroPlugin::new(config.rest_reminder_minutes)));
    }
    plugins
}

/// Seconds since the previous sample, clamped to a sane tick gap.
#[derive(Debug, Default)]
struct TickClock {
    last: Option<NaiveDateTime>,
}

impl TickClock {
    fn advance(&mut self, now: NaiveDateTime) -> u64 {
        let elapsed = self
            .last
            .map(|prev| (now - prev).num_seconds().clamp(0, MAX_TICK_GAP_SECS))
            .unwrap_or(0);
        self.last = Some(now);
        elapsed as u64
    }
}

// ── Achievements ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Keystrokes(u64),
    ActiveMinutes(u64),
    VoiceChats(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub condition: Condition,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "warming_up",
        name: "Warming Up",
        condition: Condition::Keystrokes(100),
    },
    Achievement {
        id: "keyboard_warrior",
        name: "Keyboard Warrior",
        condition: Condition::Keystrokes(5000),
    },
    Achievement {
        id: "deep_focus",
        name: "Deep Focus",
        condition: Condition::ActiveMinutes(60),
    },
    Achievement {
        id: "marathon",
        name: "Marathon Coder",
        condition: Condition::ActiveMinutes(240),
    },
    Achievement {
        id: "small_talk",
        name: "Small Talk",
        condition: Condition::VoiceChats(1),
    },
];

/// Unlocks each achievement at most once per day.
#[derive(Debug, Default)]
pub struct AchievementPlugin {
    day: Option<NaiveDate>,
    keystrokes: u64,
    active_secs: u64,
    voice_chats: u32,
    unlocked: HashSet<&'static str>,
    clock: TickClock,
}

impl AchievementPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue a day already in progress, so stored unlocks are not granted again.
    pub fn resume(record: &DayRecord) -> Self {
        let unlocked = ACHIEVEMENTS
            .iter()
            .filter(|a| record.achievements.iter().any(|id| id == a.id))
            .map(|a| a.id)
            .collect();
        Self {
            day: Some(record.date),
            keystrokes: record.totals.total_keystrokes,
            active_secs: record.totals.total_seconds,
            unlocked,
            ..Self::default()
        }
    }

    fn roll_day(&mut self, date: NaiveDate) {
        if self.day != Some(date) {
            self.day = Some(date);
            self.keystrokes = 0;
            self.active_secs = 0;
            self.voice_chats = 0;
            self.unlocked.clear();
        }
    }

    fn met(&self, condition: Condition) -> bool {
        match condition {
            Condition::Keystrokes(n) => self.keystrokes >= n,
            Condition::ActiveMinutes(m) => self.active_secs >= m * 60,
            Condition::VoiceChats(n) => self.voice_chats >= n,
        }
    }

    fn check(&mut self) -> Vec<ExternalEvent> {
        let mut events = Vec::new();
        for a in ACHIEVEMENTS {
            if !self.unlocked.contains(a.id) && self.met(a.condition) {
                self.unlocked.insert(a.id);
                info!("Achievement unlocked: {}", a.name);
                events.push(ExternalEvent::AchievementUnlocked {
                    id: a.id.to_string(),
                    name: a.name.to_string(),
                });
            }
        }
        events
    }
}

impl PetPlugin for AchievementPlugin {
    fn name(&self) -> &str {
        "achievement"
    }

    fn on_tick(&mut self, sample: &ActivitySample) -> Vec<ExternalEvent> {
        self.roll_day(sample.date());
        let elapsed = self.clock.advance(sample.timestamp);
        if sample.tool_active {
            self.active_secs += elapsed;
        }
        self.keystrokes += sample.keystroke_delta;
        self.check()
    }

    fn on_event(&mut self, event: &ExternalEvent) -> Vec<ExternalEvent> {
        if let ExternalEvent::VoiceReply { .. } = event {
            self.voice_chats += 1;
            return self.check();
        }
        Vec::new()
    }
}

// ── Pomodoro ──

/// Inactivity this long counts as a break and restarts the work timer.
const BREAK_SECS: u64 = 5 * 60;

/// Reminds the user to rest after a long uninterrupted stretch.
#[derive(Debug)]
pub struct PomodoroPlugin {
    work_limit_secs: u64,
    worked_secs: u64,
    resting_secs: u64,
    clock: TickClock,
}

impl PomodoroPlugin {
    pub fn new(rest_reminder_minutes: u64) -> Self {
        Self {
            work_limit_secs: rest_reminder_minutes.max(1) * 60,
            worked_secs: 0,
            resting_secs: 0,
            clock: TickClock::default(),
        }
    }
}

impl PetPlugin for PomodoroPlugin {
    fn name(&self) -> &str {
        "pomodoro"
    }

    fn on_tick(&mut self, sample: &ActivitySample) -> Vec<ExternalEvent> {
        let elapsed = self.clock.advance(sample.timestamp);

        if !sample.tool_active {
            self.resting_secs += elapsed;
            if self.resting_secs >= BREAK_SECS {
                self.worked_secs = 0;
            }
            return Vec::new();
        }

        self.resting_secs = 0;
        self.worked_secs += elapsed;
        if self.worked_secs >= self.work_limit_secs {
            let active_minutes = self.worked_secs / 60;
            self.worked_secs = 0;
            info!("Rest reminder after {} active minutes", active_minutes);
            return vec![ExternalEvent::RestReminder { active_minutes }];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SessionId;

    fn at(minute: i64, second: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(minute * 60 + second)
    }

    #[test]
    fn test_keystroke_achievement_unlocks_once() {
        let mut plugin = AchievementPlugin::new();
        assert!(plugin.on_tick(&ActivitySample::new(at(0, 0), true, 60)).is_empty());

        let events = plugin.on_tick(&ActivitySample::new(at(0, 2), true, 60));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ExternalEvent::AchievementUnlocked { id, .. } if id == "warming_up"
        ));

        assert!(plugin.on_tick(&ActivitySample::new(at(0, 4), true, 60)).is_empty());
    }

    #[test]
    fn test_achievements_reset_on_new_day() {
        let mut plugin = AchievementPlugin::new();
        assert_eq!(plugin.on_tick(&ActivitySample::new(at(0, 0), true, 150)).len(), 1);

        let next_day = at(0, 0) + chrono::Duration::days(1);
        let events = plugin.on_tick(&ActivitySample::new(next_day, true, 150));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_resumed_day_keeps_stored_unlocks() {
        let record = DayRecord {
            date: at(0, 0).date(),
            totals: crate::types::DailyTotals {
                total_seconds: 600,
                total_keystrokes: 4990,
            },
            goals_met: false,
            achievements: vec!["warming_up".into()],
        };
        let mut plugin = AchievementPlugin::resume(&record);
        let events = plugin.on_tick(&ActivitySample::new(at(0, 0), true, 20));
        // Only the newly crossed threshold is granted
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ExternalEvent::AchievementUnlocked { id, .. } if id == "keyboard_warrior"
        ));
    }

    #[test]
    fn test_from_config_seeds_achievements() {
        let config = Config::default();
        let record = DayRecord {
            achievements: vec!["warming_up".into()],
            ..DayRecord::empty(at(0, 0).date())
        };
        let mut plugins = from_config(&config, Some(&record));
        let sample = ActivitySample::new(at(0, 0), true, 150);
        let events: Vec<ExternalEvent> =
            plugins.iter_mut().flat_map(|p| p.on_tick(&sample)).collect();
        assert!(!events
            .iter()
            .any(|e| matches!(e, ExternalEvent::AchievementUnlocked { .. })));
    }

    #[test]
    fn test_voice_chat_achievement_from_event() {
        let mut plugin = AchievementPlugin::new();
        let reply = ExternalEvent::VoiceReply {
            session_id: SessionId::new(),
            text: "hi".into(),
            audio: None,
        };
        let events = plugin.on_event(&reply);
        assert!(matches!(
            &events[0],
            ExternalEvent::AchievementUnlocked { id, .. } if id == "small_talk"
        ));
        assert!(plugin.on_event(&reply).is_empty());
    }

    #[test]
    fn test_active_minutes_ignore_long_gaps() {
        let mut plugin = AchievementPlugin::new();
        plugin.on_tick(&ActivitySample::new(at(0, 0), true, 0));
        // Two hours later: the gap is clamped to a single tick gap
        plugin.on_tick(&ActivitySample::new(at(120, 0), true, 0));
        assert_eq!(plugin.active_secs, MAX_TICK_GAP_SECS as u64);
    }

    #[test]
    fn test_pomodoro_reminds_after_limit() {
        let mut plugin = PomodoroPlugin::new(1);
        let mut reminders = 0;
        for tick in 0..=40 {
            let sample = ActivitySample::new(at(0, tick * 2), true, 5);
            reminders += plugin.on_tick(&sample).len();
        }
        // 80 seconds of work with a 60 second limit
        assert_eq!(reminders, 1);
    }

    #[test]
    fn test_pomodoro_break_resets_timer() {
        let mut plugin = PomodoroPlugin::new(10);
        plugin.on_tick(&ActivitySample::new(at(0, 0), true, 5));
        for minute in 1..=9 {
            assert!(plugin
                .on_tick(&ActivitySample::new(at(minute, 0), true, 5))
                .is_empty());
        }
        // Six one-minute idle ticks count as a break
        for minute in 10..=15 {
            plugin.on_tick(&ActivitySample::new(at(minute, 0), false, 0));
        }
        assert_eq!(plugin.worked_secs, 0);
        assert!(plugin
            .on_tick(&ActivitySample::new(at(16, 0), true, 5))
            .is_empty());
    }
}
