//! User-configurable timer durations and behavior flags.

use serde::{Deserialize, Serialize};

use super::container::Persist;
use crate::error::{ConfigError, CoreError, ValidationError};
use crate::storage::{self, get_json_value_by_path, keys, set_json_value_by_path, KeyValueStore};
use crate::timer::TimerMode;

/// Longest accepted session or extension, in minutes.
pub const MAX_DURATION_MINUTES: u64 = 24 * 60;

/// Largest accepted long-break interval.
pub const MAX_LONG_BREAK_INTERVAL: u64 = 100;

/// Per-mode duration in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub focus: u64,
    pub short: u64,
    pub long: u64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            focus: 25,
            short: 5,
            long: 15,
        }
    }
}

impl Durations {
    pub fn minutes(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus,
            TimerMode::Short => self.short,
            TimerMode::Long => self.long,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub durations: Durations,
    pub auto_start_breaks: bool,
    pub long_break_interval: u64,
    pub is_deep_focus: bool,
    /// Minutes of focus per day that count as a perfect day.
    pub daily_goal: u64,
    /// Seconds.
    pub breathing_duration: u64,
    pub show_percentage: bool,
    /// Length of a flow extension, in minutes.
    pub flow_duration: u64,
    pub intermission_duration: u64,
    pub allowed_domains: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            durations: Durations::default(),
            auto_start_breaks: false,
            long_break_interval: 4,
            is_deep_focus: false,
            daily_goal: 120,
            breathing_duration: 10,
            show_percentage: false,
            flow_duration: 15,
            intermission_duration: 15,
            allowed_domains: vec![
                "spotify.com".into(),
                "todoist.com".into(),
                "youtube.com".into(),
            ],
        }
    }
}

impl Settings {
    /// Load the stored slice. Out-of-range numbers are clamped, since
    /// stored data never went through [`Settings::validate`].
    pub fn load(kv: &dyn KeyValueStore) -> Self {
        let loaded: Self = storage::load_or(kv, keys::SETTINGS, Self::default());
        let clamped = loaded.clamped();
        if clamped != loaded {
            tracing::warn!("stored settings out of range, clamped");
        }
        clamped
    }

    pub fn duration_secs(&self, mode: TimerMode) -> u64 {
        self.durations.minutes(mode).saturating_mul(60)
    }

    pub fn flow_duration_secs(&self) -> u64 {
        self.flow_duration.saturating_mul(60)
    }

    fn clamped(&self) -> Self {
        let minutes = |m: u64| m.clamp(1, MAX_DURATION_MINUTES);
        Self {
            durations: Durations {
                focus: minutes(self.durations.focus),
                short: minutes(self.durations.short),
                long: minutes(self.durations.long),
            },
            flow_duration: minutes(self.flow_duration),
            long_break_interval: self.long_break_interval.clamp(1, MAX_LONG_BREAK_INTERVAL),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |field: &str, message: &str| ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };
        let minutes = [
            ("durations.focus", self.durations.focus),
            ("durations.short", self.durations.short),
            ("durations.long", self.durations.long),
            ("flowDuration", self.flow_duration),
        ];
        for (field, value) in minutes {
            if value == 0 {
                return Err(invalid(field, "must be at least 1 minute"));
            }
            if value > MAX_DURATION_MINUTES {
                return Err(invalid(field, "must be at most 1440 minutes"));
            }
        }
        if self.long_break_interval == 0 {
            return Err(invalid("longBreakInterval", "must be at least 1"));
        }
        if self.long_break_interval > MAX_LONG_BREAK_INTERVAL {
            return Err(invalid("longBreakInterval", "must be at most 100"));
        }
        Ok(())
    }

    /// Get a value as string by dot-separated camelCase key,
    /// e.g. `durations.focus` or `autoStartBreaks`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Return a copy with `key` set to `value`, validated.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self, CoreError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(self).map_err(|e| invalid(e.to_string()))?;
        set_json_value_by_path(&mut json, key, value)?;
        let next: Self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        next.validate()?;
        Ok(next)
    }
}

impl Persist for Settings {
    fn persist(&self, prev: &Self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        if self == prev {
            return Ok(());
        }
        storage::save(kv, keys::SETTINGS, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_match_widget() {
        let s = Settings::default();
        assert_eq!(s.duration_secs(TimerMode::Focus), 25 * 60);
        assert_eq!(s.duration_secs(TimerMode::Short), 5 * 60);
        assert_eq!(s.duration_secs(TimerMode::Long), 15 * 60);
        assert_eq!(s.long_break_interval, 4);
        assert_eq!(s.daily_goal, 120);
        assert!(!s.auto_start_breaks);
        assert_eq!(s.allowed_domains.len(), 3);
    }

    #[test]
    fn partial_stored_slice_fills_defaults() {
        let kv = MemoryStore::new();
        kv.set(keys::SETTINGS, r#"{"autoStartBreaks":true,"durations":{"focus":50,"short":10,"long":20}}"#)
            .unwrap();
        let s = Settings::load(&kv);
        assert!(s.auto_start_breaks);
        assert_eq!(s.durations.focus, 50);
        assert_eq!(s.flow_duration, 15);
    }

    #[test]
    fn get_and_with_value_use_dotted_keys() {
        let s = Settings::default();
        assert_eq!(s.get("durations.focus").as_deref(), Some("25"));
        let s = s.with_value("durations.focus", "45").unwrap();
        assert_eq!(s.durations.focus, 45);
        let s = s.with_value("autoStartBreaks", "true").unwrap();
        assert!(s.auto_start_breaks);
    }

    #[test]
    fn with_value_rejects_zero_interval() {
        let err = Settings::default()
            .with_value("longBreakInterval", "0")
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn with_value_rejects_durations_past_a_day() {
        let s = Settings::default();
        for key in ["durations.focus", "durations.long", "flowDuration"] {
            let err = s.with_value(key, "18446744073709551615").unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{key}");
        }
        assert!(s.with_value("durations.focus", "1440").is_ok());
        assert!(s.with_value("longBreakInterval", "101").is_err());
    }

    #[test]
    fn out_of_range_stored_values_are_clamped() {
        let kv = MemoryStore::new();
        kv.set(
            keys::SETTINGS,
            r#"{"durations":{"focus":18446744073709551615,"short":0,"long":15},"flowDuration":99999}"#,
        )
        .unwrap();
        let s = Settings::load(&kv);
        assert_eq!(s.durations.focus, MAX_DURATION_MINUTES);
        assert_eq!(s.durations.short, 1);
        assert_eq!(s.flow_duration, MAX_DURATION_MINUTES);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn duration_secs_saturates() {
        let mut s = Settings::default();
        s.durations.focus = u64::MAX;
        s.flow_duration = u64::MAX;
        assert_eq!(s.duration_secs(TimerMode::Focus), u64::MAX);
        assert_eq!(s.flow_duration_secs(), u64::MAX);
    }

    #[test]
    fn unchanged_settings_are_not_rewritten() {
        let kv = MemoryStore::new();
        let s = Settings::default();
        s.persist(&s.clone(), &kv).unwrap();
        assert!(kv.is_empty());
    }
}
