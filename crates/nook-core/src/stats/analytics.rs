//! Read-only metrics derived from statistics and tasks.
//!
//! Every ratio guards its denominator; no function returns NaN. Dates
//! that are missing or do not parse are skipped.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use serde::Serialize;

use crate::state::{StatsData, Task};

const MS_PER_DAY: f64 = 86_400_000.0;

fn percent(part: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u64
}

pub fn today_minutes(stats: &StatsData, today: NaiveDate) -> u64 {
    let key = today.format("%Y-%m-%d").to_string();
    stats.daily_history.get(&key).copied().unwrap_or(0)
}

/// Share of focus sessions that completed rather than being abandoned.
pub fn flow_score(stats: &StatsData) -> u64 {
    let focus = stats.session_counts.focus;
    percent(focus, focus + stats.abandoned_sessions)
}

/// Busiest hour as `"H:00 - H+1:00"`, or `None` with no activity.
pub fn golden_hour(stats: &StatsData) -> Option<String> {
    let max = stats.hourly_activity.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return None;
    }
    let hour = stats.hourly_activity.iter().position(|&m| m == max)?;
    Some(format!("{hour}:00 - {}:00", (hour + 1) % 24))
}

/// Average focus minutes per day since install (at least one day).
pub fn daily_average(stats: &StatsData, now: DateTime<Utc>) -> u64 {
    let elapsed_ms = (now - stats.install_date).num_milliseconds().unsigned_abs() as f64;
    let days = (elapsed_ms / MS_PER_DAY).ceil().max(1.0);
    (stats.minutes as f64 / days).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateVerdict {
    NoData,
    NeedsFocus,
    Underestimating,
    Overestimating,
    SpotOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EstimationAccuracy {
    /// Actual pomodoros as a percentage of estimated.
    pub value: u64,
    pub verdict: EstimateVerdict,
}

impl fmt::Display for EstimationAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            EstimateVerdict::NoData => f.write_str("No data"),
            EstimateVerdict::NeedsFocus => f.write_str("Needs focus"),
            EstimateVerdict::Underestimating => write!(f, "Underestimating ({}%)", self.value),
            EstimateVerdict::Overestimating => write!(f, "Overestimating ({}%)", self.value),
            EstimateVerdict::SpotOn => f.write_str("Spot on!"),
        }
    }
}

/// Compare estimated and completed pomodoros over completed tasks.
pub fn estimation_accuracy<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> EstimationAccuracy {
    let (mut count, mut estimated, mut actual) = (0u64, 0u64, 0u64);
    for task in tasks.into_iter().filter(|t| t.completed) {
        count += 1;
        estimated += u64::from(task.estimated_pomos.max(1));
        actual += u64::from(task.completed_pomos);
    }

    if count == 0 {
        return EstimationAccuracy {
            value: 100,
            verdict: EstimateVerdict::NoData,
        };
    }
    if actual == 0 {
        return EstimationAccuracy {
            value: 0,
            verdict: EstimateVerdict::NeedsFocus,
        };
    }

    let value = percent(actual, estimated);
    let verdict = if value > 120 {
        EstimateVerdict::Underestimating
    } else if value < 80 {
        EstimateVerdict::Overestimating
    } else {
        EstimateVerdict::SpotOn
    };
    EstimationAccuracy { value, verdict }
}

/// Share of prioritized focus minutes spent on priority 3 and 4.
pub fn priority_focus(stats: &StatsData) -> u64 {
    let total: u64 = stats.priority_dist.values().sum();
    let high: u64 = [3u8, 4]
        .iter()
        .filter_map(|p| stats.priority_dist.get(p))
        .sum();
    percent(high, total)
}

/// Average lateness of completed tasks archived after their due date.
///
/// `"0h"` when nothing was late, then `"Nm"`, `"N hours"` or `"N days"`.
pub fn procrastination_index<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    offset: FixedOffset,
) -> String {
    let (mut total_ms, mut late) = (0i64, 0i64);
    for task in tasks {
        if !task.completed || task.created().is_none() {
            continue;
        }
        let (Some(due), Some(archived_at)) = (task.due(), task.archived_at) else {
            continue;
        };
        let Some(due_end) = due
            .and_hms_milli_opt(23, 59, 59, 999)
            .and_then(|end| offset.from_local_datetime(&end).single())
        else {
            continue;
        };
        let due_end_ms = due_end.timestamp_millis();
        if archived_at > due_end_ms {
            total_ms += archived_at - due_end_ms;
            late += 1;
        }
    }

    if late == 0 {
        return "0h".into();
    }
    let avg_minutes = (total_ms as f64 / late as f64 / 60_000.0).round() as u64;
    if avg_minutes < 60 {
        return format!("{avg_minutes}m");
    }
    let avg_hours = (avg_minutes as f64 / 60.0).round() as u64;
    if avg_hours > 24 {
        return format!("{} days", (avg_hours as f64 / 24.0).round() as u64);
    }
    format!("{avg_hours} hours")
}

/// Category with the most completed tasks; first seen wins ties.
pub fn category_champion<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> String {
    let mut order: Vec<(&str, u64)> = Vec::new();
    for task in tasks {
        let done = u64::from(task.completed);
        match order.iter_mut().find(|(name, _)| *name == task.category) {
            Some((_, completed)) => *completed += done,
            None => order.push((task.category.as_str(), done)),
        }
    }

    let mut champion = "None";
    let mut best: Option<u64> = None;
    for (name, completed) in order {
        if best.map_or(true, |b| completed > b) {
            best = Some(completed);
            champion = name;
        }
    }
    champion.to_string()
}

/// Pauses per focus session, one decimal place.
pub fn flow_depth(stats: &StatsData) -> String {
    let sessions = stats.session_counts.focus.max(1);
    format!("{:.1}", stats.total_pauses as f64 / sessions as f64)
}

pub fn abandonment_rate(stats: &StatsData) -> u64 {
    let abandoned = stats.abandoned_sessions;
    percent(abandoned, stats.session_counts.focus + abandoned)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeekSplit {
    pub weekday: u64,
    pub weekend: u64,
}

/// Percent of focus minutes on weekdays vs. weekends.
pub fn week_split(stats: &StatsData) -> WeekSplit {
    let (mut weekday, mut weekend) = (0u64, 0u64);
    for (date, minutes) in &stats.daily_history {
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            continue;
        };
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => weekend += minutes,
            _ => weekday += minutes,
        }
    }
    let total = weekday + weekend;
    WeekSplit {
        weekday: percent(weekday, total),
        weekend: percent(weekend, total),
    }
}

/// Share of hourly activity between 22:00 and 02:00.
pub fn night_owl_score(stats: &StatsData) -> u64 {
    let at = |h: usize| stats.hourly_activity.get(h).copied().unwrap_or(0);
    let late = at(22) + at(23) + at(0) + at(1);
    percent(late, stats.hourly_activity.iter().sum())
}

/// Focus hours per `YYYY-MM`, last six months with data, oldest first.
///
/// Each day's minutes are rounded to whole hours before summing.
pub fn monthly_velocity(stats: &StatsData) -> Vec<(String, u64)> {
    let mut months: BTreeMap<String, u64> = BTreeMap::new();
    for (date, minutes) in &stats.daily_history {
        let Some(month) = date.get(..7) else {
            continue;
        };
        *months.entry(month.to_string()).or_insert(0) += (*minutes as f64 / 60.0).round() as u64;
    }
    let skip = months.len().saturating_sub(6);
    months.into_iter().skip(skip).collect()
}

pub fn completion_rate<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u64 {
    let (mut total, mut done) = (0u64, 0u64);
    for task in tasks {
        total += 1;
        done += u64::from(task.completed);
    }
    percent(done, total)
}

/// Largest category total, at least 1 (a chart scale).
pub fn dist_max(stats: &StatsData) -> u64 {
    stats.category_dist.values().copied().max().unwrap_or(0).max(1)
}

/// Every derived metric at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub today_minutes: u64,
    pub daily_goal: u64,
    pub flow_score: u64,
    pub golden_hour: Option<String>,
    pub daily_average: u64,
    pub estimation_accuracy: EstimationAccuracy,
    pub estimation_text: String,
    pub priority_focus: u64,
    pub procrastination_index: String,
    pub category_champion: String,
    pub flow_depth: String,
    pub abandonment_rate: u64,
    pub week_split: WeekSplit,
    pub night_owl_score: u64,
    pub monthly_velocity: Vec<(String, u64)>,
    pub completion_rate: u64,
    pub dist_max: u64,
    pub streak: u64,
    pub best_streak: u64,
    pub perfect_days: u64,
}

impl Dashboard {
    pub fn compute(stats: &StatsData, tasks: &[&Task], daily_goal: u64, now: DateTime<FixedOffset>) -> Self {
        let accuracy = estimation_accuracy(tasks.iter().copied());
        Self {
            today_minutes: today_minutes(stats, now.date_naive()),
            daily_goal,
            flow_score: flow_score(stats),
            golden_hour: golden_hour(stats),
            daily_average: daily_average(stats, now.with_timezone(&Utc)),
            estimation_accuracy: accuracy,
            estimation_text: accuracy.to_string(),
            priority_focus: priority_focus(stats),
            procrastination_index: procrastination_index(tasks.iter().copied(), *now.offset()),
            category_champion: category_champion(tasks.iter().copied()),
            flow_depth: flow_depth(stats),
            abandonment_rate: abandonment_rate(stats),
            week_split: week_split(stats),
            night_owl_score: night_owl_score(stats),
            monthly_velocity: monthly_velocity(stats),
            completion_rate: completion_rate(tasks.iter().copied()),
            dist_max: dist_max(stats),
            streak: stats.streak,
            best_streak: stats.best_streak,
            perfect_days: stats.perfect_days,
        }
    }
}
