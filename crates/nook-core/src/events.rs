use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{TimerMode, TimerState};

/// Every timer transition and sync outcome produces an Event.
/// The CLI prints them as JSON; tests match on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The whole-second remaining value changed.
    TimerTick {
        remaining_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        mode: TimerMode,
        is_focus: bool,
        at: DateTime<Utc>,
    },
    TimerCancelled {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    /// Mode switched without starting a countdown.
    ModeChanged {
        mode: TimerMode,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A focus session finished; the user may extend or take a break.
    IntermissionOffered {
        at: DateTime<Utc>,
    },
    SessionExtended {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: TimerMode,
        remaining_secs: u64,
        initial_secs: u64,
        progress_pct: f64,
        is_extension: bool,
        at: DateTime<Utc>,
    },
    TasksSynced {
        fetched: usize,
        total: usize,
        at: DateTime<Utc>,
    },
    SyncFailed {
        message: String,
        at: DateTime<Utc>,
    },
}

/// Convert epoch milliseconds to a UTC timestamp for event payloads.
pub(crate) fn at_ms(epoch_ms: u64) -> DateTime<Utc> {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::TimerCompleted {
            mode: TimerMode::Focus,
            is_focus: true,
            at: at_ms(0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerCompleted");
        assert_eq!(json["mode"], "focus");
    }

    #[test]
    fn at_ms_converts_epoch() {
        assert_eq!(at_ms(1_000).timestamp(), 1);
    }
}
