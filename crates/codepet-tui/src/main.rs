//! codepet-tui: Terminal frontend for the CodePet desktop pet.
//! Uses Ratatui + Crossterm for rendering.

mod app;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use codepet_core::config::Config;
use codepet_core::controller::PetController;
use codepet_core::events::{ExternalEvent, InteractionKind, PetEvent};
use codepet_core::plugins;
use codepet_core::prompts::{self, LineContext};
use codepet_core::sampler::{ActivitySampler, ForegroundWindow, KeystrokeCounter};
use codepet_core::stats::{DailyTracker, JsonlStatsStore, MemoryStatsStore, StatsStore};
use codepet_core::voice::{OpenAiVoice, VoiceDispatcher};

use app::{App, ChatSide};

fn init_logging() {
    // Log to a file, not stdout, since we own the terminal
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("codepet-tui.log");
    if let Ok(file) = file {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .try_init();
    }
}

fn load_config(project_root: &std::path::Path) -> Config {
    let config_path = project_root.join("config.yaml");
    if !config_path.exists() {
        info!("No config.yaml, using defaults");
    } else {
        match Config::load(&config_path) {
            Ok(config) => return config,
            Err(e) => warn!("Invalid config.yaml, using defaults: {:#}", e),
        }
    }
    Config {
        project_root: project_root.to_path_buf(),
        ..Config::default()
    }
}

fn interaction_key(code: KeyCode) -> Option<InteractionKind> {
    match code {
        KeyCode::F(1) => Some(InteractionKind::Click),
        KeyCode::F(2) => Some(InteractionKind::Pet),
        KeyCode::F(3) => Some(InteractionKind::Feed),
        _ => None,
    }
}

fn interaction_command(text: &str) -> Option<InteractionKind> {
    match text {
        "/click" | "/poke" => Some(InteractionKind::Click),
        "/pet" => Some(InteractionKind::Pet),
        "/feed" => Some(InteractionKind::Feed),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&project_root);
    let tick_every = Duration::from_secs(config.tick_interval_seconds);

    // Stats: an unreadable data dir costs persistence, not the pet
    let store: Box<dyn StatsStore> = match JsonlStatsStore::open(&config.data_path()) {
        Ok(store) => Box::new(store),
        Err(e) => {
            error!("Stats will not be saved this session: {}", e);
            Box::new(MemoryStatsStore::new())
        }
    };
    let today = chrono::Local::now().date_naive();
    let mut tracker = DailyTracker::new(
        store,
        today,
        config.tick_interval_seconds,
        config.daily_goal_seconds(),
        config.stats_flush_seconds,
    );

    // Sampling: without a window command, the pet's own terminal is the tool
    let keys = KeystrokeCounter::new();
    let mut sampler = ActivitySampler::from_config(
        &config,
        keys.clone(),
        ForegroundWindow {
            process: "terminal".to_string(),
            title: "codepet".to_string(),
        },
    );

    let plugins = plugins::from_config(&config, Some(&tracker.day_record()));
    let mut controller = PetController::with_plugins(config.clone(), plugins);
    controller.resume_day(tracker.date(), tracker.totals().total_keystrokes);
    let mut pet_rx = controller.subscribe();

    // Voice results come back through this channel
    let (voice_tx, mut voice_rx) = mpsc::channel::<ExternalEvent>(16);
    let mut voice = if config.voice_enabled {
        match OpenAiVoice::from_config(&config) {
            Ok(generator) => Some(VoiceDispatcher::new(generator, voice_tx)),
            Err(e) => {
                error!("Voice disabled, could not build HTTP client: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut app = App::new(&config.pet_name, voice.is_some());
    if let Some(greeting) = prompts::lines(config.personality, LineContext::Greeting).first() {
        app.push_message(ChatSide::Pet, *greeting);
    }
    controller.publish_stats(tracker.totals(), tracker.streak(), tracker.goal_progress());

    info!("Starting TUI for {}", config.pet_name);

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut next_tick = Instant::now() + tick_every;

    // Main event loop
    loop {
        // Draw
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Voice results (non-blocking)
        while let Ok(event) = voice_rx.try_recv() {
            controller.on_external_event(event);
        }

        // Activity tick
        if Instant::now() >= next_tick {
            next_tick = Instant::now() + tick_every;
            let sample = sampler.sample(chrono::Local::now().naive_local());

            let update = tracker.add(&sample);
            if update.goal_reached {
                controller.on_external_event(ExternalEvent::GoalReached {
                    hours: config.daily_goal_hours,
                });
            }
            controller.tick(sample);
            if update.flushed || update.rolled_over {
                controller.publish_stats(tracker.totals(), tracker.streak(), tracker.goal_progress());
            }
            app.totals = tracker.totals();
            app.goal_progress = tracker.goal_progress();
            app.day_keystrokes = controller.day_keystrokes();
        }

        // Next action for the sprite
        controller.present(&mut app.pet);
        app.pet.advance();
        app.collect_speech();

        // Controller events (non-blocking)
        loop {
            match pet_rx.try_recv() {
                Ok(event) => {
                    if let PetEvent::Achievement { id, .. } = &event {
                        tracker.record_achievement(id);
                    }
                    app.handle_event(event)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        // Handle terminal events
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if let Some(kind) = interaction_key(key.code) {
                    controller.on_external_event(ExternalEvent::Interaction { interaction: kind });
                    continue;
                }

                match (key.code, key.modifiers) {
                    // Quit
                    (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    (KeyCode::Char('q'), KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    // Focus toggle
                    (KeyCode::Tab, _) => {
                        app.input_focused = !app.input_focused;
                    }
                    // Input handling
                    (KeyCode::Enter, _) if app.input_focused => {
                        let Some(text) = app.take_input() else {
                            continue;
                        };
                        if text == "/quit" {
                            app.should_quit = true;
                        } else if text == "/week" {
                            app.show_weekly(&tracker.weekly_summary());
                        } else if let Some(kind) = interaction_command(&text) {
                            controller
                                .on_external_event(ExternalEvent::Interaction { interaction: kind });
                        } else if text.starts_with('/') {
                            app.push_message(
                                ChatSide::System,
                                "commands: /click /pet /feed /week /quit",
                            );
                        } else if let Some(dispatcher) = voice.as_mut() {
                            let session = controller.begin_voice_session();
                            dispatcher.submit(session, text, controller.current_mood());
                            app.voice_pending = true;
                        } else {
                            app.push_message(ChatSide::System, "(voice is off)");
                        }
                    }
                    // Only typing counts as coding activity
                    (KeyCode::Char(c), _) if app.input_focused => {
                        keys.record();
                        app.input.push(c);
                    }
                    (KeyCode::Backspace, _) if app.input_focused => {
                        keys.record();
                        app.input.pop();
                    }
                    // Scroll
                    (KeyCode::Up, _) if !app.input_focused => app.scroll_up(),
                    (KeyCode::Down, _) if !app.input_focused => app.scroll_down(),
                    (KeyCode::PageUp, _) => app.scroll_up(),
                    (KeyCode::PageDown, _) => app.scroll_down(),
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Cleanup
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    if let Some(dispatcher) = voice.as_mut() {
        dispatcher.cancel();
    }
    if let Err(e) = tracker.flush() {
        error!("Failed to save stats on exit: {}", e);
    }
    info!("Bye from {}", config.pet_name);

    Ok(())
}
