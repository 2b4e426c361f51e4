//! Pure folds of timer lifecycle facts into [`StatsData`].
//!
//! Callers supply the local wall-clock time; nothing here reads a clock.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::state::{PauseBucket, StatsData};
use crate::timer::TimerMode;

/// Category credited when no task is focused.
pub const DEFAULT_CATEGORY: &str = "General";

/// Priority credited when no task is focused.
pub const DEFAULT_PRIORITY: u8 = 1;

/// What a finished focus session is credited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusCredit<'a> {
    pub category: &'a str,
    pub priority: u8,
}

/// Outcome of folding one focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusFold {
    pub today_minutes: u64,
    pub perfect_day: bool,
    pub streak: u64,
}

pub fn record_session_count(stats: &mut StatsData, mode: TimerMode) {
    stats.session_counts.increment(mode);
}

/// Fold `minutes` of focus ending at local time `at`.
///
/// Credits the daily history, hourly slot, weekly cell, total minutes,
/// streak and perfect-day counters. Without a task the minutes go to
/// category `General` and priority 1, so every distribution sums to the
/// total focus minutes.
pub fn fold_focus(
    stats: &mut StatsData,
    minutes: u64,
    at: NaiveDateTime,
    daily_goal: u64,
    task: Option<FocusCredit<'_>>,
) -> FocusFold {
    let today = at.date();
    let hour = at.hour() as usize;
    let weekday = at.weekday().num_days_from_sunday() as usize;

    let day_key = today.format("%Y-%m-%d").to_string();
    let old_today = stats.daily_history.get(&day_key).copied().unwrap_or(0);
    let new_today = old_today + minutes;
    stats.daily_history.insert(day_key, new_today);

    if stats.hourly_activity.len() < 24 {
        stats.hourly_activity.resize(24, 0);
    }
    stats.hourly_activity[hour] += minutes;

    if stats.weekly_hourly.len() != 7 {
        stats.weekly_hourly = vec![vec![0; 24]; 7];
    }
    let row = &mut stats.weekly_hourly[weekday];
    if row.len() < 24 {
        row.resize(24, 0);
    }
    row[hour] += minutes;

    stats.minutes += minutes;

    if stats.last_active_date != Some(today) {
        let yesterday = today.pred_opt();
        if yesterday.is_some() && stats.last_active_date == yesterday {
            stats.streak += 1;
        } else {
            stats.streak = 1;
        }
    }
    stats.best_streak = stats.best_streak.max(stats.streak);
    stats.last_active_date = Some(today);

    let perfect_day = old_today < daily_goal && new_today >= daily_goal;
    if perfect_day {
        stats.perfect_days += 1;
    }

    let category = task
        .map(|t| t.category)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);
    *stats.category_dist.entry(category.to_string()).or_insert(0) += minutes;

    let priority = task.map_or(DEFAULT_PRIORITY, |t| t.priority).max(DEFAULT_PRIORITY);
    *stats.priority_dist.entry(priority).or_insert(0) += minutes;

    FocusFold {
        today_minutes: new_today,
        perfect_day,
        streak: stats.streak,
    }
}

/// Quartile of a session's progress percentage.
pub fn pause_bucket(progress_pct: f64) -> PauseBucket {
    if progress_pct > 75.0 {
        PauseBucket::LastQuarter
    } else if progress_pct > 50.0 {
        PauseBucket::ThirdQuarter
    } else if progress_pct > 25.0 {
        PauseBucket::SecondQuarter
    } else {
        PauseBucket::FirstQuarter
    }
}

/// Record a mid-focus pause. `abandoned` when the focused task is not done.
pub fn record_pause(stats: &mut StatsData, progress_pct: f64, abandoned: bool) -> PauseBucket {
    let bucket = pause_bucket(progress_pct);
    stats.total_pauses += 1;
    stats.pause_dist.increment(bucket);
    if abandoned {
        stats.abandoned_sessions += 1;
    }
    bucket
}

/// Whether the break after `sessions` completed focus sessions is long.
pub fn is_long_break(sessions: u64, interval: u64) -> bool {
    interval > 0 && sessions > 0 && sessions % interval == 0
}
