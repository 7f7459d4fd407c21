//! The pet controller: turns activity samples and external events into a
//! stream of actions for the presenter.
//!
//! Mood is re-derived every tick from the rolling sample history. Mood
//! changes and external events both land in one bounded priority queue; the
//! presenter pulls from it with [`PetController::next_action`]. While an
//! external action is on screen the pet is *reacting*: mood actions wait
//! until the reaction expires, then the current mood's action is re-issued.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::{ExternalEvent, PetEvent, SessionId};
use crate::mood::{self, MoodParams};
use crate::plugins::{self, PetPlugin};
use crate::prompts;
use crate::queue::ActionQueue;
use crate::types::*;

/// Something that can show an animation, e.g. a terminal sprite or a window.
pub trait AnimationPresenter {
    fn play(&mut self, animation: &str, action: &ActionEvent);
}

pub struct PetController {
    config: Config,
    params: MoodParams,
    reaction_display: Duration,

    history: VecDeque<ActivitySample>,
    day: Option<NaiveDate>,
    day_keystrokes: u64,

    current_mood: MoodState,
    current_action: ActionKind,
    queue: ActionQueue,
    reacting_until: Option<Instant>,
    voice_session: Option<SessionId>,

    plugins: Vec<Box<dyn PetPlugin>>,
    event_tx: broadcast::Sender<PetEvent>,
}

impl PetController {
    /// Controller with the plugins enabled in `config`.
    pub fn new(config: Config) -> Self {
        let plugins = plugins::from_config(&config, None);
        Self::with_plugins(config, plugins)
    }

    pub fn with_plugins(config: Config, plugins: Vec<Box<dyn PetPlugin>>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let params = config.mood_params();
        let reaction_display =
            Duration::from_secs_f64(config.reaction_display_seconds.max(0.0));
        let queue = ActionQueue::new(config.queue_capacity);

        info!(
            "Pet controller ready: {} ({}), {} plugin(s)",
            config.pet_name,
            config.personality,
            plugins.len()
        );

        Self {
            history: VecDeque::with_capacity(params.history_len()),
            params,
            reaction_display,
            day: None,
            day_keystrokes: 0,
            current_mood: MoodState::Idle,
            current_action: ActionKind::Idle,
            queue,
            reacting_until: None,
            voice_session: None,
            plugins,
            event_tx,
            config,
        }
    }

    /// Resume today's keystroke total, e.g. from persisted stats.
    pub fn resume_day(&mut self, date: NaiveDate, keystrokes: u64) {
        self.day = Some(date);
        self.day_keystrokes = keystrokes;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PetEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_mood(&self) -> MoodState {
        self.current_mood
    }

    pub fn current_action(&self) -> ActionKind {
        self.current_action
    }

    pub fn day_keystrokes(&self) -> u64 {
        self.day_keystrokes
    }

    pub fn is_reacting(&self) -> bool {
        self.reacting_until.is_some()
    }

    /// Pending actions, highest priority first.
    pub fn pending(&self) -> impl Iterator<Item = &ActionEvent> {
        self.queue.iter()
    }

    /// Broadcast today's totals to subscribers.
    pub fn publish_stats(&self, totals: DailyTotals, streak: StreakInfo, goal_progress: f64) {
        self.emit(PetEvent::Stats {
            totals,
            streak,
            goal_progress,
        });
    }

    fn emit(&self, event: PetEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    // ── Ticks ──

    /// Feed one sample. Re-derives the mood and enqueues its action when it
    /// changed, or when a milestone was crossed this tick. Returns the mood
    /// after this tick.
    pub fn tick(&mut self, sample: ActivitySample) -> MoodState {
        self.expire_reaction();

        let date = sample.date();
        if self.day != Some(date) {
            if self.day.is_some() {
                info!("New day {}, resetting keystroke total", date);
            }
            self.day = Some(date);
            self.day_keystrokes = 0;
        }
        self.day_keystrokes += sample.keystroke_delta;

        self.history.push_back(sample.clone());
        while self.history.len() > self.params.history_len() {
            self.history.pop_front();
        }

        let mood = mood::evaluate(
            self.history.make_contiguous(),
            self.day_keystrokes,
            &self.params,
        );
        let changed = mood != self.current_mood;
        if changed {
            info!("Mood {} -> {}", self.current_mood, mood);
            self.emit(PetEvent::Mood {
                previous: self.current_mood,
                current: mood,
            });
            self.current_mood = mood;
        }
        // Each milestone celebrates, even right after another one
        if changed || mood == MoodState::Celebrating {
            self.enqueue_mood(mood);
        }

        let mut produced = Vec::new();
        for plugin in self.plugins.iter_mut() {
            let events = plugin.on_tick(&sample);
            if !events.is_empty() {
                debug!("plugin {} produced {} event(s)", plugin.name(), events.len());
            }
            produced.extend(events);
        }
        for event in produced {
            self.enqueue_plugin_event(event);
        }

        mood
    }

    /// Queue the action for `mood`, replacing any mood action still waiting.
    /// A pending celebration is kept so a milestone is never lost to the
    /// mood that follows it.
    fn enqueue_mood(&mut self, mood: MoodState) {
        let superseded = self.queue.remove_where(|e| {
            !e.is_external() && e.kind != MoodState::Celebrating.default_action()
        });
        if superseded > 0 {
            debug!("{} pending mood action(s) superseded", superseded);
        }

        let mut action = ActionEvent::for_mood(mood);
        if let Some(line) = prompts::mood_line(self.config.personality, mood) {
            action = action.with_message(line);
        }
        self.enqueue(action);
    }

    fn enqueue_plugin_event(&mut self, event: ExternalEvent) {
        if let ExternalEvent::AchievementUnlocked { id, name } = &event {
            self.emit(PetEvent::Achievement {
                id: id.clone(),
                name: name.clone(),
            });
        }
        self.enqueue(event.to_action());
    }

    fn enqueue(&mut self, action: ActionEvent) {
        if let Some(evicted) = self.queue.push(action) {
            warn!(
                "Action queue full, dropped {} (priority {})",
                evicted.kind, evicted.priority
            );
            self.emit(PetEvent::Dropped {
                reason: format!("queue full: {}", evicted.kind),
            });
        }
    }

    // ── External events ──

    /// Start a new voice conversation turn. Results tagged with any earlier
    /// session are discarded from now on.
    pub fn begin_voice_session(&mut self) -> SessionId {
        let id = SessionId::new();
        debug!("voice session {}", id);
        self.voice_session = Some(id);
        id
    }

    pub fn cancel_voice_session(&mut self) {
        self.voice_session = None;
    }

    pub fn on_external_event(&mut self, event: ExternalEvent) {
        if let Some(id) = event.session_id() {
            if self.voice_session != Some(id) {
                debug!("Dropping stale {} for session {}", event.label(), id);
                self.emit(PetEvent::Dropped {
                    reason: format!("stale {} for session {}", event.label(), id),
                });
                return;
            }
            // One result per session
            self.voice_session = None;
        }

        let mut follow_ups = Vec::new();
        for plugin in self.plugins.iter_mut() {
            follow_ups.extend(plugin.on_event(&event));
        }

        info!("External event: {}", event.label());
        self.enqueue(event.to_action());
        for follow_up in follow_ups {
            self.enqueue_plugin_event(follow_up);
        }
    }

    /// Accept an event in wire form. Malformed or unknown events are logged
    /// and dropped without touching controller state.
    pub fn on_raw_event(&mut self, raw: serde_json::Value) {
        match ExternalEvent::from_json(raw) {
            Ok(event) => self.on_external_event(event),
            Err(e) => {
                warn!("Dropping malformed external event: {}", e);
                self.emit(PetEvent::Dropped {
                    reason: format!("malformed event: {}", e),
                });
            }
        }
    }

    // ── Presenter side ──

    fn expire_reaction(&mut self) {
        let Some(until) = self.reacting_until else {
            return;
        };
        if Instant::now() < until {
            return;
        }
        self.reacting_until = None;
        debug!("Reaction over, back to {}", self.current_mood);
        self.emit(PetEvent::Reacting { active: false });
        self.enqueue_mood(self.current_mood);
    }

    /// Take the next action to show. While reacting, only external actions
    /// can interrupt.
    pub fn next_action(&mut self) -> Option<ActionEvent> {
        self.expire_reaction();

        let action = if self.is_reacting() {
            self.queue.pop_first(ActionEvent::is_external)?
        } else {
            self.queue.pop()?
        };

        self.current_action = action.kind;
        if action.is_external() {
            if !self.is_reacting() {
                self.emit(PetEvent::Reacting { active: true });
            }
            self.reacting_until = Some(Instant::now() + self.reaction_display);
        }

        self.emit(PetEvent::Action {
            name: self.config.animation_name(action.kind).to_string(),
            action: action.clone(),
        });
        Some(action)
    }

    /// Hand the next action, if any, to `presenter`.
    pub fn present(&mut self, presenter: &mut dyn AnimationPresenter) -> Option<ActionKind> {
        let action = self.next_action()?;
        let animation = self.config.animation_name(action.kind).to_string();
        presenter.play(&animation, &action);
        Some(action.kind)
    }
}
