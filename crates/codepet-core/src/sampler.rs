//! Activity sampling: which tool is in front, and how much typing happened
//! since the last tick.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::ActivitySample;

/// Browsers whose window title decides whether they count as a dev tool.
const BROWSERS: &[&str] = &["chrome", "msedge", "firefox", "safari", "brave"];

/// A window command still running after this long is killed.
pub const WINDOW_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("window detection unavailable: {0}")]
    Unavailable(String),
    #[error("window command timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub process: String,
    pub title: String,
}

pub trait WindowProbe: Send {
    fn foreground(&mut self) -> Result<ForegroundWindow, SampleError>;
}

/// Latest result of the window command.
#[derive(Debug, Clone)]
enum Reading {
    Pending,
    Window(ForegroundWindow),
    Failed(String),
    TimedOut(Duration),
}

/// Runs a user-supplied shell command that prints `process<TAB>title`.
///
/// The command runs on a background task every `poll_every`; `foreground`
/// only reads the newest result, so a slow command never stalls the caller.
pub struct CommandProbe {
    latest: watch::Receiver<Reading>,
    task: JoinHandle<()>,
}

impl CommandProbe {
    /// Start polling. Must be called inside a tokio runtime.
    pub fn new(command: &str, poll_every: Duration, timeout: Duration) -> Result<Self, SampleError> {
        let shell = which::which("sh")
            .map_err(|e| SampleError::Unavailable(format!("no shell for window command: {}", e)))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SampleError::Unavailable(format!("no async runtime: {}", e)))?;

        let (tx, latest) = watch::channel(Reading::Pending);
        let command = command.to_string();
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(poll_every.max(Duration::from_millis(100)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let reading = run_window_command(&shell, &command, timeout).await;
                if let Reading::TimedOut(limit) = &reading {
                    warn!("Window command still running after {:?}, killed", limit);
                }
                if tx.send(reading).is_err() {
                    break;
                }
            }
        });
        Ok(Self { latest, task })
    }
}

impl Drop for CommandProbe {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_window_command(shell: &Path, command: &str, timeout: Duration) -> Reading {
    let output = tokio::process::Command::new(shell)
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(timeout, output).await {
        Err(_) => Reading::TimedOut(timeout),
        Ok(Err(e)) => Reading::Failed(format!("window command failed: {}", e)),
        Ok(Ok(output)) if !output.status.success() => {
            Reading::Failed(format!("window command exited with {}", output.status))
        }
        Ok(Ok(output)) => match parse_probe_output(&String::from_utf8_lossy(&output.stdout)) {
            Some(window) => Reading::Window(window),
            None => Reading::Failed("window command printed nothing".into()),
        },
    }
}

/// Parse the first line of probe output.
fn parse_probe_output(stdout: &str) -> Option<ForegroundWindow> {
    let line = stdout.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    let (process, title) = line.split_once('\t').unwrap_or((line, ""));
    Some(ForegroundWindow {
        process: process.trim().to_string(),
        title: title.trim().to_string(),
    })
}

impl WindowProbe for CommandProbe {
    fn foreground(&mut self) -> Result<ForegroundWindow, SampleError> {
        match &*self.latest.borrow() {
            Reading::Window(window) => Ok(window.clone()),
            Reading::Pending => Err(SampleError::Unavailable("no window reading yet".into())),
            Reading::Failed(reason) => Err(SampleError::Unavailable(reason.clone())),
            Reading::TimedOut(limit) => Err(SampleError::Timeout(*limit)),
        }
    }
}

/// Always reports the same window. Used when the pet's own terminal is the
/// tool being watched.
pub struct FixedProbe(pub ForegroundWindow);

impl WindowProbe for FixedProbe {
    fn foreground(&mut self) -> Result<ForegroundWindow, SampleError> {
        Ok(self.0.clone())
    }
}

/// Shared keystroke count, fed by whatever input source the frontend has.
#[derive(Debug, Clone)]
pub struct KeystrokeCounter {
    inner: Arc<CounterInner>,
}

#[derive(Debug)]
struct CounterInner {
    count: AtomicU64,
    /// Millis since `epoch` of the last keystroke
    last_input_ms: AtomicU64,
    epoch: Instant,
}

impl KeystrokeCounter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CounterInner {
                count: AtomicU64::new(0),
                last_input_ms: AtomicU64::new(0),
                epoch: Instant::now(),
            }),
        }
    }

    pub fn record(&self) {
        let ms = self.inner.epoch.elapsed().as_millis() as u64;
        self.inner.count.fetch_add(1, Ordering::Relaxed);
        self.inner.last_input_ms.store(ms, Ordering::Relaxed);
    }

    /// Keystrokes since the previous call.
    pub fn take(&self) -> u64 {
        self.inner.count.swap(0, Ordering::Relaxed)
    }

    /// Time since the last keystroke (or since the counter was created).
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.inner.last_input_ms.load(Ordering::Relaxed));
        self.inner.epoch.elapsed().saturating_sub(last)
    }
}

impl Default for KeystrokeCounter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ActivitySampler {
    probe: Box<dyn WindowProbe>,
    keys: KeystrokeCounter,
    programming_apps: Vec<String>,
    programming_sites: Vec<String>,
    idle_threshold: Duration,
}

impl ActivitySampler {
    pub fn new(
        probe: Box<dyn WindowProbe>,
        keys: KeystrokeCounter,
        programming_apps: Vec<String>,
        programming_sites: Vec<String>,
        idle_threshold: Duration,
    ) -> Self {
        Self {
            probe,
            keys,
            programming_apps: programming_apps.iter().map(|a| a.to_lowercase()).collect(),
            programming_sites: programming_sites.iter().map(|s| s.to_lowercase()).collect(),
            idle_threshold,
        }
    }

    /// Build from config: the configured window command, or `fallback` when
    /// none is set or it cannot be used.
    pub fn from_config(
        config: &Config,
        keys: KeystrokeCounter,
        fallback: ForegroundWindow,
    ) -> Self {
        let probe: Box<dyn WindowProbe> = match config.window_command.as_deref() {
            Some(cmd) => match CommandProbe::new(
                cmd,
                Duration::from_secs(config.tick_interval_seconds),
                WINDOW_COMMAND_TIMEOUT,
            ) {
                Ok(probe) => Box::new(probe),
                Err(e) => {
                    warn!("window_command unusable, watching the terminal instead: {}", e);
                    Box::new(FixedProbe(fallback))
                }
            },
            None => Box::new(FixedProbe(fallback)),
        };
        Self::new(
            probe,
            keys,
            config.programming_apps.clone(),
            config.programming_sites.clone(),
            Duration::from_secs(config.idle_threshold_seconds),
        )
    }

    pub fn is_programming(&self, window: &ForegroundWindow) -> bool {
        let process = window.process.to_lowercase();
        if self.programming_apps.iter().any(|app| process.contains(app)) {
            return true;
        }
        if BROWSERS.iter().any(|b| process.contains(b)) {
            let title = window.title.to_lowercase();
            return self.programming_sites.iter().any(|site| title.contains(site));
        }
        false
    }

    /// Produce the sample for this tick. Never fails: when the foreground
    /// window cannot be determined the tick counts as inactive.
    pub fn sample(&mut self, timestamp: NaiveDateTime) -> ActivitySample {
        let keystrokes = self.keys.take();

        let window = match self.probe.foreground() {
            Ok(w) => w,
            Err(e) => {
                warn!("Activity sampling failed, recording an idle tick: {}", e);
                return ActivitySample::inactive(timestamp);
            }
        };

        let idle = self.keys.idle_for();
        let tool_active = self.is_programming(&window) && idle <= self.idle_threshold;
        debug!(
            "sample: process={} active={} keys={} idle={:?}",
            window.process, tool_active, keystrokes, idle
        );

        // Typing outside a dev tool does not count
        let delta = if tool_active { keystrokes } else { 0 };
        ActivitySample::new(timestamp, tool_active, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenProbe;

    impl WindowProbe for BrokenProbe {
        fn foreground(&mut self) -> Result<ForegroundWindow, SampleError> {
            Err(SampleError::Unavailable("no display".into()))
        }
    }

    fn window(process: &str, title: &str) -> ForegroundWindow {
        ForegroundWindow {
            process: process.into(),
            title: title.into(),
        }
    }

    fn ts() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn sampler(probe: Box<dyn WindowProbe>, keys: KeystrokeCounter) -> ActivitySampler {
        ActivitySampler::new(
            probe,
            keys,
            vec!["Code".into(), "terminal".into()],
            vec!["github".into()],
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_is_programming_by_process_and_site() {
        let s = sampler(Box::new(BrokenProbe), KeystrokeCounter::new());
        assert!(s.is_programming(&window("code.exe", "main.rs")));
        assert!(s.is_programming(&window("firefox", "rust-lang/rust · GitHub")));
        assert!(!s.is_programming(&window("firefox", "Cat videos")));
        assert!(!s.is_programming(&window("spotify", "github")));
    }

    #[test]
    fn test_sample_counts_keystrokes_in_tool() {
        let keys = KeystrokeCounter::new();
        let mut s = sampler(Box::new(FixedProbe(window("terminal", ""))), keys.clone());
        for _ in 0..7 {
            keys.record();
        }
        let sample = s.sample(ts());
        assert!(sample.tool_active);
        assert_eq!(sample.keystroke_delta, 7);
        // Counter was drained
        assert_eq!(s.sample(ts()).keystroke_delta, 0);
    }

    #[test]
    fn test_keystrokes_outside_tool_are_ignored() {
        let keys = KeystrokeCounter::new();
        let mut s = sampler(Box::new(FixedProbe(window("spotify", ""))), keys.clone());
        keys.record();
        let sample = s.sample(ts());
        assert!(!sample.tool_active);
        assert_eq!(sample.keystroke_delta, 0);
    }

    #[test]
    fn test_probe_failure_yields_zero_sample() {
        let keys = KeystrokeCounter::new();
        let mut s = sampler(Box::new(BrokenProbe), keys.clone());
        keys.record();
        assert_eq!(s.sample(ts()), ActivitySample::inactive(ts()));
    }

    #[test]
    fn test_idle_beyond_threshold_is_inactive() {
        let keys = KeystrokeCounter::new();
        let mut s = ActivitySampler::new(
            Box::new(FixedProbe(window("terminal", ""))),
            keys,
            vec!["terminal".into()],
            vec![],
            Duration::ZERO,
        );
        std::thread::sleep(Duration::from_millis(5));
        assert!(!s.sample(ts()).tool_active);
    }

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(
            parse_probe_output("code\tlib.rs - codepet\n"),
            Some(window("code", "lib.rs - codepet"))
        );
        assert_eq!(parse_probe_output("kitty\n"), Some(window("kitty", "")));
        assert_eq!(parse_probe_output("\n"), None);
    }

    impl CommandProbe {
        async fn next_reading(&mut self) {
            self.latest.changed().await.unwrap();
        }
    }

    const RARELY: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_command_probe_runs_shell() {
        if which::which("sh").is_err() {
            return;
        }
        let mut probe =
            CommandProbe::new("printf 'nvim\\tmain.rs'", RARELY, Duration::from_secs(5)).unwrap();
        probe.next_reading().await;
        assert_eq!(probe.foreground().unwrap(), window("nvim", "main.rs"));

        let mut failing = CommandProbe::new("exit 3", RARELY, Duration::from_secs(5)).unwrap();
        failing.next_reading().await;
        assert!(matches!(failing.foreground(), Err(SampleError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_slow_window_command_does_not_block_sample() {
        if which::which("sh").is_err() {
            return;
        }
        let probe = CommandProbe::new(
            "sleep 3; printf 'nvim\\tmain.rs'",
            RARELY,
            Duration::from_secs(10),
        )
        .unwrap();
        let mut s = sampler(Box::new(probe), KeystrokeCounter::new());

        let started = Instant::now();
        let sample = s.sample(ts());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(sample, ActivitySample::inactive(ts()));
    }

    #[tokio::test]
    async fn test_hung_window_command_times_out() {
        if which::which("sh").is_err() {
            return;
        }
        let mut probe = CommandProbe::new("sleep 3", RARELY, Duration::from_millis(100)).unwrap();
        probe.next_reading().await;
        assert!(matches!(probe.foreground(), Err(SampleError::Timeout(_))));

        let mut s = sampler(Box::new(probe), KeystrokeCounter::new());
        assert_eq!(s.sample(ts()), ActivitySample::inactive(ts()));
    }

    #[test]
    fn test_window_command_needs_runtime() {
        assert!(CommandProbe::new("true", RARELY, WINDOW_COMMAND_TIMEOUT).is_err());
    }
}
