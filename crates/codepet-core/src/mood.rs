//! Mood derivation: a pure function from recent activity to a MoodState.
//!
//! The newest `window_size` samples form the current window. Ticks missing
//! from a short history count as inactive, so the activity ratio and the
//! keystroke rate are always divided by the full window size.

use serde::{Deserialize, Serialize};

use crate::types::{ActivitySample, MoodState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodParams {
    pub window_size: usize,
    /// Keystrokes per tick
    pub low_activity_threshold: f64,
    /// Consecutive low-rate windows required before encouraging
    pub encourage_after_windows: usize,
    /// Ascending daily keystroke totals worth celebrating
    pub keystroke_milestones: Vec<u64>,
}

impl MoodParams {
    /// Samples needed to judge every condition. Callers keep at least this much history.
    pub fn history_len(&self) -> usize {
        self.window_size.max(1) + self.encourage_after_windows.max(1) - 1
    }
}

/// Activity summary of one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub active_ratio: f64,
    pub keystroke_rate: f64,
    /// True when the history had enough samples to fill the window
    pub full: bool,
}

/// Summarize the window that ends `offset` samples before the newest one.
pub fn window_stats(history: &[ActivitySample], window_size: usize, offset: usize) -> WindowStats {
    let window_size = window_size.max(1);
    let end = history.len().saturating_sub(offset);
    let start = end.saturating_sub(window_size);
    let window = &history[start..end];

    let active = window.iter().filter(|s| s.tool_active).count();
    let keystrokes: u64 = window.iter().map(|s| s.keystroke_delta).sum();

    WindowStats {
        active_ratio: active as f64 / window_size as f64,
        keystroke_rate: keystrokes as f64 / window_size as f64,
        full: window.len() == window_size,
    }
}

/// True when the newest sample pushed the day's total across a milestone.
///
/// `day_keystrokes` is the total including the newest sample.
pub fn crossed_milestone(
    history: &[ActivitySample],
    day_keystrokes: u64,
    milestones: &[u64],
) -> Option<u64> {
    let newest = history.last()?;
    let before = day_keystrokes.saturating_sub(newest.keystroke_delta);
    milestones
        .iter()
        .copied()
        .filter(|m| before < *m && *m <= day_keystrokes)
        .last()
}

/// Derive the mood for the newest tick.
///
/// Deterministic: identical history, day total and params always yield the
/// same mood. Conditions are checked in tie-break order
/// Celebrating > Sleepy > Encouraging > Happy > Idle.
pub fn evaluate(history: &[ActivitySample], day_keystrokes: u64, params: &MoodParams) -> MoodState {
    if crossed_milestone(history, day_keystrokes, &params.keystroke_milestones).is_some() {
        return MoodState::Celebrating;
    }

    let current = window_stats(history, params.window_size, 0);

    if current.active_ratio == 0.0 {
        // Too little history to call the pet sleepy yet
        return if current.full {
            MoodState::Sleepy
        } else {
            MoodState::Idle
        };
    }

    if current.keystroke_rate >= params.low_activity_threshold {
        return MoodState::Happy;
    }

    let needed = params.encourage_after_windows.max(1);
    let low_streak = (0..needed).all(|offset| {
        let w = window_stats(history, params.window_size, offset);
        w.full && w.active_ratio > 0.0 && w.keystroke_rate < params.low_activity_threshold
    });
    if low_streak {
        MoodState::Encouraging
    } else {
        MoodState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params() -> MoodParams {
        MoodParams {
            window_size: 5,
            low_activity_threshold: 2.0,
            encourage_after_windows: 3,
            keystroke_milestones: vec![1000, 5000],
        }
    }

    fn samples(pattern: &[(bool, u64)]) -> Vec<ActivitySample> {
        let base = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        pattern.iter()
            .enumerate()
            .map(|(i, (active, keys))| {
                ActivitySample::new(
                    base + chrono::Duration::seconds(2 * i as i64),
                    *active,
                    *keys,
                )
            })
            .collect()
    }

    #[test]
    fn test_active_window_above_threshold_is_happy() {
        let history = samples(&[(true, 10); 5]);
        assert_eq!(evaluate(&history, 50, &params()), MoodState::Happy);
    }

    #[test]
    fn test_inactive_window_is_sleepy() {
        let history = samples(&[(false, 0); 5]);
        assert_eq!(evaluate(&history, 0, &params()), MoodState::Sleepy);
    }

    #[test]
    fn test_sleepy_for_any_zero_ratio_full_window() {
        // Older activity outside the window does not matter
        let mut pattern = vec![(true, 40); 7];
        pattern.extend([(false, 0); 5]);
        let history = samples(&pattern);
        assert_eq!(evaluate(&history, 280, &params()), MoodState::Sleepy);
    }

    #[test]
    fn test_short_inactive_history_is_idle() {
        let history = samples(&[(false, 0); 3]);
        assert_eq!(evaluate(&history, 0, &params()), MoodState::Idle);
        assert_eq!(evaluate(&[], 0, &params()), MoodState::Idle);
    }

    #[test]
    fn test_low_rate_needs_consecutive_windows() {
        // One low window only: not yet encouraging
        let history = samples(&[(true, 1); 5]);
        assert_eq!(evaluate(&history, 5, &params()), MoodState::Idle);

        // window 5 + 3 windows - 1 = 7 low samples
        let history = samples(&[(true, 1); 7]);
        assert_eq!(evaluate(&history, 7, &params()), MoodState::Encouraging);
    }

    #[test]
    fn test_low_streak_broken_by_busy_window() {
        let mut pattern = vec![(true, 30); 2];
        pattern.extend([(true, 1); 5]);
        let history = samples(&pattern);
        // The window one tick back still averages above the threshold
        assert_eq!(evaluate(&history, 65, &params()), MoodState::Idle);
    }

    #[test]
    fn test_partial_activity_uses_full_window_denominator() {
        // 2 active ticks of 4 keys = 8 keys / 5 ticks = 1.6 < 2.0
        let history = samples(&[(false, 0), (false, 0), (false, 0), (true, 4), (true, 4)]);
        let stats = window_stats(&history, 5, 0);
        assert!((stats.active_ratio - 0.4).abs() < 1e-9);
        assert!((stats.keystroke_rate - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_milestone_crossing_celebrates_once() {
        let history = samples(&[(true, 10); 5]);
        // 995 before, 1005 after the newest sample
        assert_eq!(evaluate(&history, 1005, &params()), MoodState::Celebrating);
        // Next tick the total is already past the milestone
        assert_eq!(evaluate(&history, 1015, &params()), MoodState::Happy);
    }

    #[test]
    fn test_milestone_hit_exactly() {
        let history = samples(&[(true, 10); 5]);
        assert_eq!(
            crossed_milestone(&history, 1000, &[1000]),
            Some(1000)
        );
        assert_eq!(crossed_milestone(&history, 999, &[1000]), None);
    }

    #[test]
    fn test_celebrating_beats_sleepy() {
        // A burst recorded on an otherwise inactive window still celebrates
        let mut history = samples(&[(false, 0); 5]);
        history.last_mut().unwrap().keystroke_delta = 20;
        assert_eq!(evaluate(&history, 1010, &params()), MoodState::Celebrating);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let history = samples(&[
            (true, 3),
            (false, 0),
            (true, 1),
            (true, 0),
            (false, 0),
            (true, 2),
            (true, 1),
        ]);
        let first = evaluate(&history, 7, &params());
        for _ in 0..20 {
            assert_eq!(evaluate(&history, 7, &params()), first);
        }
    }

    #[test]
    fn test_history_len() {
        assert_eq!(params().history_len(), 7);
    }
}
