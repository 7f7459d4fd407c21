//! Configuration: YAML config + env var overrides, validated at load time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mood::MoodParams;
use crate::types::{ActionKind, Personality};

/// Known provider presets
const PROVIDER_PRESETS: &[(&str, Option<&str>)] = &[
    ("openai", None),
    ("openrouter", Some("https://openrouter.ai/api/v1")),
];

/// Provider-specific API key env vars (checked before OPENAI_API_KEY fallback)
const PROVIDER_KEY_ENV_VARS: &[(&str, &str)] = &[("openrouter", "OPENROUTER_API_KEY")];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_pet_name")]
    pub pet_name: String,

    #[serde(default)]
    pub personality: Personality,

    /// Seconds between controller ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,

    /// Ticks per mood window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Keystrokes per tick below which activity counts as low
    #[serde(default = "default_low_activity_threshold")]
    pub low_activity_threshold: f64,

    /// Consecutive low windows before the pet starts encouraging
    #[serde(default = "default_encourage_after_windows")]
    pub encourage_after_windows: usize,

    /// Daily keystroke totals that trigger a celebration (ascending)
    #[serde(default = "default_keystroke_milestones")]
    pub keystroke_milestones: Vec<u64>,

    /// How long an external reaction holds the stage
    #[serde(default = "default_reaction_display_seconds")]
    pub reaction_display_seconds: f64,

    /// Max pending actions in the controller queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// No input for this long means no tool is being used
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_seconds: u64,

    #[serde(default = "default_programming_apps")]
    pub programming_apps: Vec<String>,

    /// Browser titles mentioning any of these count as programming
    #[serde(default = "default_programming_sites")]
    pub programming_sites: Vec<String>,

    /// Command printing `process<TAB>title` of the foreground window
    #[serde(default)]
    pub window_command: Option<String>,

    #[serde(default = "default_daily_goal_hours")]
    pub daily_goal_hours: f64,

    /// How often daily totals are written to the stats store
    #[serde(default = "default_stats_flush_seconds")]
    pub stats_flush_seconds: u64,

    /// Stats file and synthesized audio live here (relative to project root)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// "openai" | "openrouter" | "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// LLM model used for voice replies
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for Chat Completions API (auto-set for known providers)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_true")]
    pub voice_enabled: bool,

    /// Text-to-speech model; speech synthesis is skipped when unset
    #[serde(default)]
    pub tts_model: Option<String>,

    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Presenter animation name for each action
    #[serde(default = "default_actions")]
    pub actions: BTreeMap<ActionKind, String>,

    /// Animations the presenter ships; empty means "trust the mapping"
    #[serde(default)]
    pub available_animations: Vec<String>,

    #[serde(default = "default_true")]
    pub achievements_enabled: bool,

    #[serde(default = "default_true")]
    pub pomodoro_enabled: bool,

    #[serde(default = "default_rest_reminder_minutes")]
    pub rest_reminder_minutes: u64,

    /// Resolved project root (set at load time, not serialized from YAML)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_pet_name() -> String {
    "Pip".into()
}
fn default_tick_interval() -> u64 {
    2
}
fn default_window_size() -> usize {
    5
}
fn default_low_activity_threshold() -> f64 {
    1.0
}
fn default_encourage_after_windows() -> usize {
    3
}
fn default_keystroke_milestones() -> Vec<u64> {
    vec![1000, 5000, 10000]
}
fn default_reaction_display_seconds() -> f64 {
    4.0
}
fn default_queue_capacity() -> usize {
    8
}
fn default_idle_threshold() -> u64 {
    300
}
fn default_programming_apps() -> Vec<String> {
    [
        "code", "pycharm", "idea", "sublime_text", "nvim", "vim", "emacs", "zed", "terminal",
        "alacritty", "kitty", "wezterm", "powershell",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_programming_sites() -> Vec<String> {
    [
        "github",
        "stackoverflow",
        "gitlab",
        "bitbucket",
        "docs.rs",
        "developer.mozilla",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_daily_goal_hours() -> f64 {
    6.0
}
fn default_stats_flush_seconds() -> u64 {
    60
}
fn default_data_dir() -> String {
    "data".into()
}
fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_max_output_tokens() -> u32 {
    300
}
fn default_true() -> bool {
    true
}
fn default_tts_voice() -> String {
    "alloy".into()
}
fn default_actions() -> BTreeMap<ActionKind, String> {
    ActionKind::ALL
        .iter()
        .map(|kind| (*kind, kind.as_str().to_string()))
        .collect()
}
fn default_rest_reminder_minutes() -> u64 {
    55
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

        config.project_root = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf()
            .canonicalize()
            .unwrap_or_else(|_| {
                config_path
                    .parent()
                    .unwrap_or(Path::new("."))
                    .to_path_buf()
            });

        // Partial action tables fall back to the built-in names
        for kind in ActionKind::ALL {
            config
                .actions
                .entry(*kind)
                .or_insert_with(|| kind.as_str().to_string());
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load config from the default location (project_root/config.yaml)
    pub fn load_from_dir(project_root: &Path) -> Result<Self> {
        Self::load(&project_root.join("config.yaml"))
    }

    fn apply_env(&mut self) {
        if let Ok(p) = std::env::var("CODEPET_PROVIDER") {
            self.provider = p;
        }

        // Base URL: env var > config > provider preset
        if let Ok(url) = std::env::var("CODEPET_BASE_URL") {
            self.base_url = Some(url);
        } else if self.base_url.is_none() {
            self.base_url = PROVIDER_PRESETS
                .iter()
                .find(|(p, _)| *p == self.provider)
                .and_then(|(_, url)| url.map(String::from));
        }

        // API key: provider-specific env var > OPENAI_API_KEY > config
        let provider_key_var = PROVIDER_KEY_ENV_VARS
            .iter()
            .find(|(p, _)| *p == self.provider)
            .map(|(_, var)| *var);
        if let Some(var) = provider_key_var {
            if let Ok(key) = std::env::var(var) {
                self.api_key = Some(key);
            }
        }
        if self.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.api_key = Some(key);
            }
        }

        if let Ok(m) = std::env::var("CODEPET_MODEL") {
            self.model = m;
        }
    }

    /// Reject settings the mood engine and controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            anyhow::bail!("window_size must be at least 1");
        }
        if self.encourage_after_windows == 0 {
            anyhow::bail!("encourage_after_windows must be at least 1");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be at least 1");
        }
        if self.tick_interval_seconds == 0 {
            anyhow::bail!("tick_interval_seconds must be at least 1");
        }
        if !self.low_activity_threshold.is_finite() || self.low_activity_threshold < 0.0 {
            anyhow::bail!("low_activity_threshold must be a non-negative number");
        }
        if !self.reaction_display_seconds.is_finite() || self.reaction_display_seconds < 0.0 {
            anyhow::bail!("reaction_display_seconds must be a non-negative number");
        }
        if self.keystroke_milestones.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!(
                "keystroke_milestones must be strictly ascending, got {:?}",
                self.keystroke_milestones
            );
        }
        if self.provider == "custom" && self.base_url.is_none() {
            anyhow::bail!(
                "Provider 'custom' requires base_url in config.yaml or CODEPET_BASE_URL env var"
            );
        }
        self.validate_actions()
    }

    fn validate_actions(&self) -> Result<()> {
        let missing: Vec<&str> = ActionKind::ALL
            .iter()
            .filter(|kind| {
                self.actions
                    .get(kind)
                    .map(|name| name.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|kind| kind.as_str())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("actions mapping has no animation for: {}", missing.join(", "));
        }

        if !self.available_animations.is_empty() {
            let unknown: Vec<&str> = self
                .actions
                .values()
                .filter(|name| !self.available_animations.contains(name))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                anyhow::bail!(
                    "actions mapping names animations the presenter does not have: {}",
                    unknown.join(", ")
                );
            }
        }
        Ok(())
    }

    /// Presenter animation name for an action.
    pub fn animation_name(&self, kind: ActionKind) -> &str {
        self.actions
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(kind.as_str())
    }

    pub fn mood_params(&self) -> MoodParams {
        MoodParams {
            window_size: self.window_size,
            low_activity_threshold: self.low_activity_threshold,
            encourage_after_windows: self.encourage_after_windows,
            keystroke_milestones: self.keystroke_milestones.clone(),
        }
    }

    pub fn data_path(&self) -> PathBuf {
        let p = Path::new(&self.data_dir);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }

    pub fn daily_goal_seconds(&self) -> u64 {
        (self.daily_goal_hours.max(0.0) * 3600.0) as u64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pet_name: default_pet_name(),
            personality: Personality::default(),
            tick_interval_seconds: default_tick_interval(),
            window_size: default_window_size(),
            low_activity_threshold: default_low_activity_threshold(),
            encourage_after_windows: default_encourage_after_windows(),
            keystroke_milestones: default_keystroke_milestones(),
            reaction_display_seconds: default_reaction_display_seconds(),
            queue_capacity: default_queue_capacity(),
            idle_threshold_seconds: default_idle_threshold(),
            programming_apps: default_programming_apps(),
            programming_sites: default_programming_sites(),
            window_command: None,
            daily_goal_hours: default_daily_goal_hours(),
            stats_flush_seconds: default_stats_flush_seconds(),
            data_dir: default_data_dir(),
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_output_tokens: default_max_output_tokens(),
            voice_enabled: true,
            tts_model: None,
            tts_voice: default_tts_voice(),
            actions: default_actions(),
            available_animations: Vec::new(),
            achievements_enabled: true,
            pomodoro_enabled: true,
            rest_reminder_minutes: default_rest_reminder_minutes(),
            project_root: PathBuf::new(),
        }
    }
}
