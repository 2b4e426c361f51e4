//! Versioned migration of stored statistics.
//!
//! Stored data carries a `schemaVersion` field; data written before the
//! field existed is version 1. Migration runs each pending step in order,
//! then merges the result onto fresh defaults field by field so that a
//! single malformed field never discards the rest.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::state::StatsData;

pub const CURRENT_VERSION: u32 = 2;

/// Nested objects merged key-by-key onto their defaults rather than replaced.
const MERGED_OBJECTS: &[&str] = &["sessionCounts", "priorityDist", "pauseDist"];

/// Turn whatever was stored into current-version statistics.
///
/// `now` is the install date used when nothing usable was stored.
pub fn migrate(raw: Option<Value>, now: DateTime<Utc>) -> StatsData {
    let defaults = StatsData::fresh(now);
    let Some(Value::Object(mut stored)) = raw else {
        return defaults;
    };

    let mut version = stored
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .map_or(1, |v| v as u32);

    if version < 2 {
        upgrade_v1(&mut stored);
        version = 2;
    }
    tracing::debug!(version, "stats migrated");

    let mut stats = merge_onto_defaults(stored, &defaults);
    normalize(&mut stats);
    stats.schema_version = CURRENT_VERSION;
    stats
}

/// Version 1 accepted a weekly matrix only when it had exactly seven rows.
fn upgrade_v1(stored: &mut Map<String, Value>) {
    let weekly_ok = stored
        .get("weeklyHourly")
        .and_then(Value::as_array)
        .is_some_and(|rows| rows.len() == 7);
    if !weekly_ok {
        stored.remove("weeklyHourly");
    }
    stored.insert("schemaVersion".into(), Value::from(2));
}

fn merge_onto_defaults(stored: Map<String, Value>, defaults: &StatsData) -> StatsData {
    let Ok(Value::Object(mut merged)) = serde_json::to_value(defaults) else {
        return defaults.clone();
    };

    for (key, value) in stored {
        let candidate = match (merged.get(&key), value) {
            (Some(Value::Object(base)), Value::Object(over))
                if MERGED_OBJECTS.contains(&key.as_str()) =>
            {
                let mut combined = base.clone();
                combined.extend(over);
                Value::Object(combined)
            }
            (_, value) => value,
        };

        let previous = merged.insert(key.clone(), candidate);
        if serde_json::from_value::<StatsData>(Value::Object(merged.clone())).is_err() {
            tracing::warn!(field = %key, "dropping malformed stats field");
            match previous {
                Some(previous) => merged.insert(key, previous),
                None => merged.remove(&key),
            };
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or_else(|_| defaults.clone())
}

fn normalize(stats: &mut StatsData) {
    stats.hourly_activity.resize(24, 0);
    if stats.weekly_hourly.len() != 7 {
        stats.weekly_hourly = vec![vec![0; 24]; 7];
    }
    for row in &mut stats.weekly_hourly {
        row.resize(24, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_or_non_object_yields_defaults() {
        assert_eq!(migrate(None, now()), StatsData::fresh(now()));
        assert_eq!(migrate(Some(json!("garbage")), now()), StatsData::fresh(now()));
    }

    #[test]
    fn unversioned_data_fills_missing_fields() {
        let raw = json!({
            "sessions": 12,
            "minutes": 300,
            "installDate": "2025-12-01T08:00:00Z",
            "sessionCounts": {"focus": 12},
            "pauseDist": {"50-75": 2}
        });
        let stats = migrate(Some(raw), now());
        assert_eq!(stats.schema_version, CURRENT_VERSION);
        assert_eq!(stats.sessions, 12);
        assert_eq!(stats.session_counts.focus, 12);
        assert_eq!(stats.session_counts.long, 0);
        assert_eq!(stats.pause_dist.third_quarter, 2);
        assert_eq!(stats.priority_dist.len(), 4);
        assert_eq!(stats.install_date.to_rfc3339(), "2025-12-01T08:00:00+00:00");
        assert_eq!(stats.weekly_hourly.len(), 7);
    }

    #[test]
    fn wrong_weekly_shape_is_replaced() {
        let raw = json!({"weeklyHourly": [[1, 2], [3]]});
        let stats = migrate(Some(raw), now());
        assert_eq!(stats.weekly_hourly, vec![vec![0; 24]; 7]);
    }

    #[test]
    fn short_rows_and_hourly_are_padded() {
        let mut weekly = vec![json!([]); 7];
        weekly[2] = json!([0, 0, 5]);
        let raw = json!({"schemaVersion": 2, "weeklyHourly": weekly, "hourlyActivity": [1, 2, 3]});
        let stats = migrate(Some(raw), now());
        assert_eq!(stats.hourly_activity.len(), 24);
        assert_eq!(stats.hourly_activity[2], 3);
        assert_eq!(stats.weekly_hourly[2][2], 5);
        assert!(stats.weekly_hourly.iter().all(|row| row.len() == 24));
    }

    #[test]
    fn malformed_field_is_dropped_alone() {
        let raw = json!({"minutes": "lots", "sessions": 4, "lastActiveDate": "2026-01-31"});
        let stats = migrate(Some(raw), now());
        assert_eq!(stats.minutes, 0);
        assert_eq!(stats.sessions, 4);
        assert_eq!(
            stats.last_active_date,
            chrono::NaiveDate::from_ymd_opt(2026, 1, 31)
        );
    }

    #[test]
    fn category_dist_is_taken_as_stored() {
        let raw = json!({"categoryDist": {"work": 50}});
        let stats = migrate(Some(raw), now());
        assert_eq!(stats.category_dist.get("work"), Some(&50));
        assert!(!stats.category_dist.contains_key("General"));
    }
}
