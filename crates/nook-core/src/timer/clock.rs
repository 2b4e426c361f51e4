//! Wall-clock source for the timer and the statistics fold.

use std::cell::Cell;

use chrono::{DateTime, Duration, FixedOffset, Local};

/// Supplies the current local wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// The host's clock, in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, at: DateTime<FixedOffset>) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.advance(Duration::milliseconds(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let start = DateTime::parse_from_rfc3339("2026-03-10T14:00:00+00:00").unwrap();
        let clock = ManualClock::new(start);
        let before = clock.now_ms();
        clock.advance_ms(1_500);
        assert_eq!(clock.now_ms() - before, 1_500);
    }
}
