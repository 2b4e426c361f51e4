//! Cumulative session statistics.
//!
//! Mutated only by timer orchestration (and the task-completed counter).
//! Field names serialize in camelCase so existing widget data loads as-is.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::container::Persist;
use crate::error::CoreError;
use crate::stats::schema;
use crate::storage::{self, keys, KeyValueStore};
use crate::timer::TimerMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCounts {
    pub focus: u64,
    pub short: u64,
    pub long: u64,
}

impl SessionCounts {
    pub fn increment(&mut self, mode: TimerMode) {
        match mode {
            TimerMode::Focus => self.focus += 1,
            TimerMode::Short => self.short += 1,
            TimerMode::Long => self.long += 1,
        }
    }
}

/// Pause counts bucketed by how far into the session the pause happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseDist {
    #[serde(rename = "0-25")]
    pub first_quarter: u64,
    #[serde(rename = "25-50")]
    pub second_quarter: u64,
    #[serde(rename = "50-75")]
    pub third_quarter: u64,
    #[serde(rename = "75-100")]
    pub last_quarter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseBucket {
    #[serde(rename = "0-25")]
    FirstQuarter,
    #[serde(rename = "25-50")]
    SecondQuarter,
    #[serde(rename = "50-75")]
    ThirdQuarter,
    #[serde(rename = "75-100")]
    LastQuarter,
}

impl PauseDist {
    pub fn increment(&mut self, bucket: PauseBucket) {
        match bucket {
            PauseBucket::FirstQuarter => self.first_quarter += 1,
            PauseBucket::SecondQuarter => self.second_quarter += 1,
            PauseBucket::ThirdQuarter => self.third_quarter += 1,
            PauseBucket::LastQuarter => self.last_quarter += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub schema_version: u32,
    pub sessions: u64,
    pub minutes: u64,
    pub tasks_completed: u64,
    pub breaks_completed: u64,
    /// `YYYY-MM-DD` (local date) to focus minutes.
    pub daily_history: BTreeMap<String, u64>,
    /// 24 slots, local hour of day.
    pub hourly_activity: Vec<u64>,
    pub category_dist: BTreeMap<String, u64>,
    pub streak: u64,
    pub last_active_date: Option<NaiveDate>,
    pub flow_extensions: u64,
    pub best_streak: u64,
    pub perfect_days: u64,
    pub session_counts: SessionCounts,
    pub install_date: DateTime<Utc>,
    pub priority_dist: BTreeMap<u8, u64>,
    pub total_pauses: u64,
    pub abandoned_sessions: u64,
    pub pause_dist: PauseDist,
    /// 7 rows (Sunday first) of 24 hourly slots.
    pub weekly_hourly: Vec<Vec<u64>>,
}

impl StatsData {
    /// Empty statistics for an installation first seen at `install_date`.
    pub fn fresh(install_date: DateTime<Utc>) -> Self {
        Self {
            schema_version: schema::CURRENT_VERSION,
            sessions: 0,
            minutes: 0,
            tasks_completed: 0,
            breaks_completed: 0,
            daily_history: BTreeMap::new(),
            hourly_activity: vec![0; 24],
            category_dist: BTreeMap::from([("General".to_string(), 0)]),
            streak: 0,
            last_active_date: None,
            flow_extensions: 0,
            best_streak: 0,
            perfect_days: 0,
            session_counts: SessionCounts::default(),
            install_date,
            priority_dist: (1..=4).map(|p| (p, 0)).collect(),
            total_pauses: 0,
            abandoned_sessions: 0,
            pause_dist: PauseDist::default(),
            weekly_hourly: vec![vec![0; 24]; 7],
        }
    }
}

/// The stats slice: statistics plus the reward counters stored beside them.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsState {
    pub stats: StatsData,
    pub seeds: u64,
    /// Opaque reward records, kept verbatim.
    pub postcards: Vec<serde_json::Value>,
}

impl StatsState {
    pub fn fresh(install_date: DateTime<Utc>) -> Self {
        Self {
            stats: StatsData::fresh(install_date),
            seeds: 0,
            postcards: Vec::new(),
        }
    }

    /// Load and migrate the slice. `now` becomes the install date when no
    /// statistics were stored yet.
    pub fn load(kv: &dyn KeyValueStore, now: DateTime<Utc>) -> Self {
        let raw: Option<serde_json::Value> = storage::load_or(kv, keys::STATS, None);
        Self {
            stats: schema::migrate(raw, now),
            seeds: storage::load_or(kv, keys::SEEDS, 0),
            postcards: storage::load_or(kv, keys::POSTCARDS, Vec::new()),
        }
    }
}

impl Persist for StatsState {
    fn persist(&self, prev: &Self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        if self.stats != prev.stats {
            storage::save(kv, keys::STATS, &self.stats)?;
        }
        if self.seeds != prev.seeds {
            storage::save(kv, keys::SEEDS, &self.seeds)?;
        }
        if self.postcards != prev.postcards {
            storage::save(kv, keys::POSTCARDS, &self.postcards)?;
        }
        Ok(())
    }
}
