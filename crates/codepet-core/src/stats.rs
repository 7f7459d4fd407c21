//! Daily usage statistics: an append-only JSONL store keyed by calendar date,
//! plus the in-memory tracker that feeds it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::types::{ActivitySample, DailyTotals, DayRecord, StreakInfo};

const STATS_FILENAME: &str = "daily_stats.jsonl";

/// Days looked back when computing streaks.
const STREAK_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stats record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable per-day aggregates. Later records for a date replace earlier ones.
pub trait StatsStore: Send {
    /// Store today's totals, keeping the date's goal flag and achievements.
    fn record(&mut self, date: NaiveDate, totals: DailyTotals) -> Result<(), StatsError>;

    fn mark_goal_met(&mut self, date: NaiveDate) -> Result<(), StatsError>;

    /// Add an unlocked achievement to the date. Repeats are ignored.
    fn add_achievement(&mut self, date: NaiveDate, id: &str) -> Result<(), StatsError>;

    fn read_day(&self, date: NaiveDate) -> Result<DayRecord, StatsError>;

    fn read_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DayRecord>, StatsError>;

    fn read_today(&self) -> Result<DayRecord, StatsError> {
        self.read_day(chrono::Local::now().date_naive())
    }
}

/// Apply `change` to the date's record, returning the result when it changed.
fn update_day(
    days: &BTreeMap<NaiveDate, DayRecord>,
    date: NaiveDate,
    change: impl FnOnce(&mut DayRecord),
) -> Option<DayRecord> {
    let current = days
        .get(&date)
        .cloned()
        .unwrap_or_else(|| DayRecord::empty(date));
    let mut next = current.clone();
    change(&mut next);
    (next != current || !days.contains_key(&date)).then_some(next)
}

/// JSONL file store: one `DayRecord` per line, last write wins.
pub struct JsonlStatsStore {
    pub path: PathBuf,
    days: BTreeMap<NaiveDate, DayRecord>,
}

impl JsonlStatsStore {
    /// Open the store in `data_dir`, loading existing records.
    pub fn open(data_dir: &Path) -> Result<Self, StatsError> {
        std::fs::create_dir_all(data_dir)?;
        let mut store = Self {
            path: data_dir.join(STATS_FILENAME),
            days: BTreeMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&mut self) -> Result<(), StatsError> {
        if !self.path.is_file() {
            return Ok(());
        }
        // Bytes, not a string: one undecodable line must not hide the rest
        let content = std::fs::read(&self.path)?;
        for line in content.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<DayRecord>(line) {
                Ok(rec) => {
                    self.days.insert(rec.date, rec);
                }
                Err(e) => error!("Failed to parse stats line: {}", e),
            }
        }
        info!("Loaded stats for {} day(s)", self.days.len());
        Ok(())
    }

    fn write(&mut self, record: DayRecord) -> Result<(), StatsError> {
        let line = serde_json::to_string(&record)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        self.days.insert(record.date, record);
        Ok(())
    }
}

impl StatsStore for JsonlStatsStore {
    fn record(&mut self, date: NaiveDate, totals: DailyTotals) -> Result<(), StatsError> {
        match update_day(&self.days, date, |r| r.totals = totals) {
            Some(record) => self.write(record),
            None => Ok(()),
        }
    }

    fn mark_goal_met(&mut self, date: NaiveDate) -> Result<(), StatsError> {
        match update_day(&self.days, date, |r| r.goals_met = true) {
            Some(record) => self.write(record),
            None => Ok(()),
        }
    }

    fn add_achievement(&mut self, date: NaiveDate, id: &str) -> Result<(), StatsError> {
        let added = update_day(&self.days, date, |r| {
            if !r.achievements.iter().any(|a| a == id) {
                r.achievements.push(id.to_string());
            }
        });
        match added {
            Some(record) => self.write(record),
            None => Ok(()),
        }
    }

    fn read_day(&self, date: NaiveDate) -> Result<DayRecord, StatsError> {
        Ok(self
            .days
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DayRecord::empty(date)))
    }

    fn read_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DayRecord>, StatsError> {
        Ok(self.days.range(from..=to).map(|(_, r)| r.clone()).collect())
    }
}

/// Store that keeps records in memory only. Used when the stats file cannot be opened.
#[derive(Default)]
pub struct MemoryStatsStore {
    days: BTreeMap<NaiveDate, DayRecord>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, date: NaiveDate, change: impl FnOnce(&mut DayRecord)) {
        if let Some(record) = update_day(&self.days, date, change) {
            self.days.insert(date, record);
        }
    }
}

impl StatsStore for MemoryStatsStore {
    fn record(&mut self, date: NaiveDate, totals: DailyTotals) -> Result<(), StatsError> {
        self.apply(date, |r| r.totals = totals);
        Ok(())
    }

    fn mark_goal_met(&mut self, date: NaiveDate) -> Result<(), StatsError> {
        self.apply(date, |r| r.goals_met = true);
        Ok(())
    }

    fn add_achievement(&mut self, date: NaiveDate, id: &str) -> Result<(), StatsError> {
        self.apply(date, |r| {
            if !r.achievements.iter().any(|a| a == id) {
                r.achievements.push(id.to_string());
            }
        });
        Ok(())
    }

    fn read_day(&self, date: NaiveDate) -> Result<DayRecord, StatsError> {
        Ok(self
            .days
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DayRecord::empty(date)))
    }

    fn read_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DayRecord>, StatsError> {
        Ok(self.days.range(from..=to).map(|(_, r)| r.clone()).collect())
    }
}

/// Current and longest run of consecutive active days ending at `today`.
///
/// The current streak tolerates today being empty so far.
pub fn compute_streak(days: &[DayRecord], today: NaiveDate) -> StreakInfo {
    let mut active: Vec<NaiveDate> = days
        .iter()
        .filter(|r| r.totals.has_activity())
        .map(|r| r.date)
        .collect();
    active.sort();
    active.dedup();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for day in &active {
        run = match prev {
            Some(p) if (*day - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }

    let mut current = 0u32;
    let mut expected = today;
    for day in active.iter().rev() {
        if *day > today {
            continue;
        }
        if *day == expected || (current == 0 && *day == today - chrono::Duration::days(1)) {
            current += 1;
            expected = *day - chrono::Duration::days(1);
        } else {
            break;
        }
    }

    StreakInfo { current, longest }
}

/// Seven days of stats ending at `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// One record per day, oldest first, with empty records for missing days
    pub days: Vec<DayRecord>,
    pub total_seconds: u64,
    pub total_keystrokes: u64,
    pub active_days: u32,
    pub goals_met: u32,
}

impl WeeklySummary {
    /// Average active seconds over the days that had activity.
    pub fn average_active_seconds(&self) -> u64 {
        if self.active_days == 0 {
            return 0;
        }
        self.total_seconds / u64::from(self.active_days)
    }
}

/// Summarize the week ending at `today` from whatever records are given.
pub fn weekly_summary(records: &[DayRecord], today: NaiveDate) -> WeeklySummary {
    let from = today - chrono::Duration::days(6);
    let days: Vec<DayRecord> = from
        .iter_days()
        .take(7)
        .map(|date| {
            records
                .iter()
                .rev()
                .find(|r| r.date == date)
                .cloned()
                .unwrap_or_else(|| DayRecord::empty(date))
        })
        .collect();

    WeeklySummary {
        from,
        to: today,
        total_seconds: days.iter().map(|r| r.totals.total_seconds).sum(),
        total_keystrokes: days.iter().map(|r| r.totals.total_keystrokes).sum(),
        active_days: days.iter().filter(|r| r.totals.has_activity()).count() as u32,
        goals_met: days.iter().filter(|r| r.goals_met).count() as u32,
        days,
    }
}

/// What a tracker update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// The previous day was closed out
    pub rolled_over: bool,
    /// Today's active time just reached the daily goal
    pub goal_reached: bool,
    /// Totals were written to the store
    pub flushed: bool,
}

/// Accumulates today's active time and keystrokes and flushes them to a store.
pub struct DailyTracker {
    store: Box<dyn StatsStore>,
    date: NaiveDate,
    totals: DailyTotals,
    goal_met: bool,
    achievements: Vec<String>,
    tick_seconds: u64,
    goal_seconds: u64,
    flush_every_secs: u64,
    since_flush_secs: u64,
}

impl DailyTracker {
    /// Resume today's record from the store. A read failure starts from zero.
    pub fn new(
        store: Box<dyn StatsStore>,
        today: NaiveDate,
        tick_seconds: u64,
        goal_seconds: u64,
        flush_every_secs: u64,
    ) -> Self {
        let record = match store.read_day(today) {
            Ok(r) => r,
            Err(e) => {
                warn!("Could not read today's stats, starting fresh: {}", e);
                DayRecord::empty(today)
            }
        };
        Self {
            store,
            date: today,
            totals: record.totals,
            goal_met: record.goals_met,
            achievements: record.achievements,
            tick_seconds,
            goal_seconds,
            flush_every_secs,
            since_flush_secs: 0,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn totals(&self) -> DailyTotals {
        self.totals
    }

    /// Today's record as the tracker sees it, including unflushed totals.
    pub fn day_record(&self) -> DayRecord {
        DayRecord {
            date: self.date,
            totals: self.totals,
            goals_met: self.goal_met,
            achievements: self.achievements.clone(),
        }
    }

    /// Fraction of the daily goal achieved (may exceed 1.0).
    pub fn goal_progress(&self) -> f64 {
        if self.goal_seconds == 0 {
            return 1.0;
        }
        self.totals.total_seconds as f64 / self.goal_seconds as f64
    }

    /// Fold one tick into today's totals. Store failures are logged and
    /// retried on the next flush; the in-memory totals stay authoritative.
    pub fn add(&mut self, sample: &ActivitySample) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();

        if sample.date() != self.date {
            if let Err(e) = self.flush() {
                error!("Failed to save stats for {}: {}", self.date, e);
            }
            info!("New day {}, closing out {}", sample.date(), self.date);
            self.date = sample.date();
            self.totals = DailyTotals::default();
            self.goal_met = false;
            self.achievements.clear();
            update.rolled_over = true;
        }

        let before = self.totals.total_seconds;
        if sample.tool_active {
            self.totals.total_seconds += self.tick_seconds;
        }
        self.totals.total_keystrokes += sample.keystroke_delta;
        update.goal_reached = self.goal_seconds > 0
            && before < self.goal_seconds
            && self.totals.total_seconds >= self.goal_seconds;
        if update.goal_reached {
            self.goal_met = true;
            if let Err(e) = self.store.mark_goal_met(self.date) {
                error!("Failed to save goal for {}: {}", self.date, e);
            }
        }

        self.since_flush_secs += self.tick_seconds;
        if self.since_flush_secs >= self.flush_every_secs {
            match self.flush() {
                Ok(()) => update.flushed = true,
                Err(e) => error!("Failed to save stats: {}", e),
            }
        }
        update
    }

    /// Remember an achievement unlocked today.
    pub fn record_achievement(&mut self, id: &str) {
        if !self.achievements.iter().any(|a| a == id) {
            self.achievements.push(id.to_string());
        }
        if let Err(e) = self.store.add_achievement(self.date, id) {
            error!("Failed to save achievement {}: {}", id, e);
        }
    }

    /// Write today's totals to the store.
    pub fn flush(&mut self) -> Result<(), StatsError> {
        self.since_flush_secs = 0;
        self.store.record(self.date, self.totals)
    }

    /// Stored history from `from` through today, with today taken from memory.
    fn history(&self, from: NaiveDate) -> Vec<DayRecord> {
        let mut days = match self.store.read_range(from, self.date) {
            Ok(days) => days,
            Err(e) => {
                warn!("Could not read stats history: {}", e);
                Vec::new()
            }
        };
        // Unflushed progress counts too
        days.retain(|r| r.date != self.date);
        days.push(self.day_record());
        days
    }

    pub fn streak(&self) -> StreakInfo {
        let from = self.date - chrono::Duration::days(STREAK_LOOKBACK_DAYS);
        compute_streak(&self.history(from), self.date)
    }

    pub fn weekly_summary(&self) -> WeeklySummary {
        let from = self.date - chrono::Duration::days(6);
        weekly_summary(&self.history(from), self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn sample_on(d: u32, active: bool, keys: u64) -> ActivitySample {
        ActivitySample::new(day(d).and_hms_opt(10, 0, 0).unwrap(), active, keys)
    }

    fn totals(secs: u64, keys: u64) -> DailyTotals {
        DailyTotals {
            total_seconds: secs,
            total_keystrokes: keys,
        }
    }

    #[test]
    fn test_record_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = JsonlStatsStore::open(dir.path()).unwrap();
            store.record(day(1), totals(60, 100)).unwrap();
            store.record(day(1), totals(120, 250)).unwrap();
            store.record(day(2), totals(30, 10)).unwrap();
        }
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        assert_eq!(store.read_day(day(1)).unwrap().totals, totals(120, 250));
        assert_eq!(store.read_day(day(3)).unwrap(), DayRecord::empty(day(3)));
        assert_eq!(store.read_range(day(1), day(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_goal_and_achievements_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = JsonlStatsStore::open(dir.path()).unwrap();
            store.record(day(1), totals(60, 100)).unwrap();
            store.add_achievement(day(1), "warming_up").unwrap();
            store.add_achievement(day(1), "warming_up").unwrap();
            store.mark_goal_met(day(1)).unwrap();
            // A later totals write keeps the flag and the list
            store.record(day(1), totals(90, 150)).unwrap();
        }
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        let record = store.read_day(day(1)).unwrap();
        assert_eq!(record.totals, totals(90, 150));
        assert!(record.goals_met);
        assert_eq!(record.achievements, vec!["warming_up".to_string()]);
    }

    #[test]
    fn test_undecodable_bytes_do_not_hide_valid_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut content =
            b"{\"date\":\"2026-03-01\",\"total_seconds\":5,\"total_keystrokes\":7}\n".to_vec();
        content.extend_from_slice(b"\xff\xfe\n");
        std::fs::write(dir.path().join(STATS_FILENAME), content).unwrap();

        let store = JsonlStatsStore::open(dir.path()).unwrap();
        assert_eq!(store.read_day(day(1)).unwrap().totals, totals(5, 7));
    }

    #[test]
    fn test_garbled_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATS_FILENAME),
            "not json\n{\"date\":\"2026-03-01\",\"total_seconds\":5,\"total_keystrokes\":7}\n",
        )
        .unwrap();
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        assert_eq!(store.read_day(day(1)).unwrap().totals, totals(5, 7));
    }

    fn record_on(d: u32, t: DailyTotals) -> DayRecord {
        DayRecord {
            totals: t,
            ..DayRecord::empty(day(d))
        }
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let days = vec![
            record_on(1, totals(10, 0)),
            record_on(2, totals(10, 0)),
            record_on(3, totals(10, 0)),
            record_on(5, totals(0, 5)),
            record_on(6, totals(10, 5)),
        ];
        let streak = compute_streak(&days, day(6));
        assert_eq!(streak.current, 2);
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn test_streak_tolerates_empty_today() {
        let days = vec![record_on(4, totals(10, 0)), record_on(5, totals(10, 0))];
        assert_eq!(compute_streak(&days, day(6)).current, 2);
        assert_eq!(compute_streak(&days, day(7)).current, 0);
    }

    #[test]
    fn test_tracker_accumulates_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        let mut tracker = DailyTracker::new(Box::new(store), day(1), 2, 3600, 4);

        assert!(!tracker.add(&sample_on(1, true, 5)).flushed);
        let update = tracker.add(&sample_on(1, false, 0));
        assert!(update.flushed);
        assert_eq!(tracker.totals(), totals(2, 5));

        let reopened = JsonlStatsStore::open(dir.path()).unwrap();
        assert_eq!(reopened.read_day(day(1)).unwrap().totals, totals(2, 5));
    }

    #[test]
    fn test_tracker_resumes_today() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStatsStore::open(dir.path()).unwrap();
        store.record(day(1), totals(100, 900)).unwrap();

        let tracker = DailyTracker::new(Box::new(store), day(1), 2, 3600, 60);
        assert_eq!(tracker.totals(), totals(100, 900));
    }

    #[test]
    fn test_tracker_rolls_over_at_midnight() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        let mut tracker = DailyTracker::new(Box::new(store), day(1), 2, 3600, 600);

        tracker.add(&sample_on(1, true, 40));
        let update = tracker.add(&sample_on(2, true, 3));
        assert!(update.rolled_over);
        assert_eq!(tracker.date(), day(2));
        assert_eq!(tracker.totals(), totals(2, 3));

        let reopened = JsonlStatsStore::open(dir.path()).unwrap();
        assert_eq!(reopened.read_day(day(1)).unwrap().totals, totals(2, 40));
    }

    #[test]
    fn test_goal_reached_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        let mut tracker = DailyTracker::new(Box::new(store), day(1), 2, 4, 600);

        assert!(!tracker.add(&sample_on(1, true, 0)).goal_reached);
        assert!(tracker.add(&sample_on(1, true, 0)).goal_reached);
        assert!(!tracker.add(&sample_on(1, true, 0)).goal_reached);
        assert!(tracker.goal_progress() > 1.0);
        assert!(tracker.day_record().goals_met);
    }

    #[test]
    fn test_tracker_resumes_goal_and_achievements() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStatsStore::open(dir.path()).unwrap();
            let mut tracker = DailyTracker::new(Box::new(store), day(1), 2, 2, 600);
            tracker.add(&sample_on(1, true, 0));
            tracker.record_achievement("warming_up");
        }
        let store = JsonlStatsStore::open(dir.path()).unwrap();
        let tracker = DailyTracker::new(Box::new(store), day(1), 2, 2, 600);
        let record = tracker.day_record();
        assert!(record.goals_met);
        assert_eq!(record.achievements, vec!["warming_up".to_string()]);
    }

    #[test]
    fn test_weekly_summary_fills_missing_days() {
        let mut store = MemoryStatsStore::new();
        store.record(day(1), totals(100, 10)).unwrap();
        store.record(day(3), totals(300, 30)).unwrap();
        store.mark_goal_met(day(3)).unwrap();
        // Outside the week ending on the 9th
        store.record(day(2), totals(0, 0)).unwrap();

        let mut tracker = DailyTracker::new(Box::new(store), day(9), 2, 3600, 600);
        tracker.add(&sample_on(9, true, 4));

        let summary = tracker.weekly_summary();
        assert_eq!(summary.from, day(3));
        assert_eq!(summary.to, day(9));
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.days[1], DayRecord::empty(day(4)));
        assert_eq!(summary.total_seconds, 302);
        assert_eq!(summary.total_keystrokes, 34);
        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.goals_met, 1);
        assert_eq!(summary.average_active_seconds(), 151);
    }

    struct FailingStore;

    impl StatsStore for FailingStore {
        fn record(&mut self, _: NaiveDate, _: DailyTotals) -> Result<(), StatsError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }
        fn mark_goal_met(&mut self, _: NaiveDate) -> Result<(), StatsError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }
        fn add_achievement(&mut self, _: NaiveDate, _: &str) -> Result<(), StatsError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }
        fn read_day(&self, _: NaiveDate) -> Result<DayRecord, StatsError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }
        fn read_range(&self, _: NaiveDate, _: NaiveDate) -> Result<Vec<DayRecord>, StatsError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }
    }

    #[test]
    fn test_store_failures_do_not_lose_totals() {
        let mut tracker = DailyTracker::new(Box::new(FailingStore), day(1), 2, 3600, 2);
        let update = tracker.add(&sample_on(1, true, 9));
        assert!(!update.flushed);
        assert_eq!(tracker.totals(), totals(2, 9));
        assert!(tracker.flush().is_err());
        assert_eq!(tracker.streak().current, 1);
        tracker.record_achievement("warming_up");
        assert_eq!(tracker.day_record().achievements.len(), 1);
    }
}
