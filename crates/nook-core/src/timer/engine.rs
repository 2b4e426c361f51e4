//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically (every 200 ms by default) while the check loop is armed.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> Idle (completed)
//!                                           |
//!                                     Intermission -> Running (extend)
//!                                                  -> Idle | Running (break)
//! ```
//!
//! Every command takes the current epoch milliseconds so the engine stays
//! free of any clock or storage dependency.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(&settings);
//! engine.start(clock.now_ms(), &settings);
//! // In a loop:
//! engine.tick(clock.now_ms()); // Returns Some(Event::TimerCompleted) at zero
//! ```

use serde::{Deserialize, Serialize};

use super::TimerMode;
use crate::events::{at_ms, Event};
use crate::state::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// Configured for a mode, not counting down.
    Idle,
    Running,
    Paused,
    /// A focus session finished and the extend-or-break choice is pending.
    Intermission,
}

/// Resolution of an intermission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntermissionAction {
    Extend,
    Break,
}

/// Core timer engine.
///
/// Invariants: `remaining_secs <= initial_secs`, and `end_time_ms` is set
/// iff `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    mode: TimerMode,
    remaining_secs: u64,
    initial_secs: u64,
    is_active: bool,
    #[serde(default)]
    is_paused: bool,
    #[serde(default)]
    is_intermission: bool,
    /// Wall-clock instant (epoch ms) the countdown reaches zero.
    #[serde(default)]
    end_time_ms: Option<u64>,
    /// Whether the periodic check should be running.
    #[serde(default)]
    loop_armed: bool,
    /// Bumped every time the check loop is (re)started.
    #[serde(default)]
    loop_generation: u64,
}

impl TimerEngine {
    /// Create an engine configured for a focus session.
    pub fn new(settings: &Settings) -> Self {
        let initial = settings.duration_secs(TimerMode::Focus);
        Self {
            mode: TimerMode::Focus,
            remaining_secs: initial,
            initial_secs: initial,
            is_active: false,
            is_paused: false,
            is_intermission: false,
            end_time_ms: None,
            loop_armed: false,
            loop_generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.is_intermission {
            TimerState::Intermission
        } else if self.is_active {
            TimerState::Running
        } else if self.is_paused {
            TimerState::Paused
        } else {
            TimerState::Idle
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn initial_secs(&self) -> u64 {
        self.initial_secs
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_intermission(&self) -> bool {
        self.is_intermission
    }

    pub fn end_time_ms(&self) -> Option<u64> {
        self.end_time_ms
    }

    pub fn is_loop_armed(&self) -> bool {
        self.loop_armed
    }

    pub fn loop_generation(&self) -> u64 {
        self.loop_generation
    }

    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        if self.initial_secs == 0 {
            return 0.0;
        }
        let elapsed = self.initial_secs.saturating_sub(self.remaining_secs);
        elapsed as f64 / self.initial_secs as f64
    }

    /// 0.0 .. 100.0
    pub fn progress_pct(&self) -> f64 {
        self.progress() * 100.0
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, is_extension: bool, now_ms: u64) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            initial_secs: self.initial_secs,
            progress_pct: self.progress_pct(),
            is_extension,
            at: at_ms(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a fresh countdown in `mode` from its configured duration.
    pub fn start_session(&mut self, mode: TimerMode, now_ms: u64, settings: &Settings) -> Option<Event> {
        self.mode = mode;
        self.reset_to(settings.duration_secs(mode));
        self.is_intermission = false;
        self.run(now_ms);
        tracing::debug!(%mode, secs = self.initial_secs, "session started");
        Some(Event::TimerStarted {
            mode,
            duration_secs: self.initial_secs,
            at: at_ms(now_ms),
        })
    }

    /// Start or resume counting down from the current remaining value.
    ///
    /// A spent countdown is re-read from settings first.
    pub fn start(&mut self, now_ms: u64, settings: &Settings) -> Option<Event> {
        if self.is_active {
            return None;
        }
        let was_paused = self.is_paused;
        if self.remaining_secs == 0 {
            self.reset_to(settings.duration_secs(self.mode));
        }
        self.is_intermission = false;
        self.run(now_ms);

        if was_paused {
            tracing::debug!(remaining = self.remaining_secs, "timer resumed");
            Some(Event::TimerResumed {
                remaining_secs: self.remaining_secs,
                at: at_ms(now_ms),
            })
        } else {
            tracing::debug!(mode = %self.mode, remaining = self.remaining_secs, "timer started");
            Some(Event::TimerStarted {
                mode: self.mode,
                duration_secs: self.remaining_secs,
                at: at_ms(now_ms),
            })
        }
    }

    /// Resume a paused countdown. No-op unless paused.
    pub fn resume(&mut self, now_ms: u64, settings: &Settings) -> Option<Event> {
        if !self.is_paused {
            return None;
        }
        self.start(now_ms, settings)
    }

    /// Freeze the countdown. Remaining seconds are preserved exactly.
    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_active {
            return None;
        }
        if let Some(diff) = self.end_time_ms.and_then(|end| whole_secs_left(end, now_ms)) {
            if diff < self.remaining_secs {
                self.remaining_secs = diff;
            }
        }
        self.is_active = false;
        self.is_paused = true;
        self.end_time_ms = None;
        self.stop_loop();
        tracing::debug!(remaining = self.remaining_secs, "timer paused");
        Some(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: at_ms(now_ms),
        })
    }

    /// Switch to `mode` and park at its configured duration without starting.
    pub fn set_mode(&mut self, mode: TimerMode, now_ms: u64, settings: &Settings) -> Option<Event> {
        self.mode = mode;
        self.is_active = false;
        self.is_intermission = false;
        self.end_time_ms = None;
        self.stop_loop();
        self.reset_to(settings.duration_secs(mode));
        tracing::debug!(%mode, "mode changed");
        Some(Event::ModeChanged {
            mode,
            duration_secs: self.initial_secs,
            at: at_ms(now_ms),
        })
    }

    /// Re-read the current mode's duration when nothing is in progress.
    ///
    /// Returns whether the countdown was reset.
    pub fn sync_with_settings(&mut self, settings: &Settings) -> bool {
        if self.is_active || self.is_intermission {
            return false;
        }
        self.reset_to(settings.duration_secs(self.mode));
        true
    }

    /// Hold the engine in the extend-or-break state after a focus completion.
    pub fn enter_intermission(&mut self, now_ms: u64) -> Option<Event> {
        if self.is_active {
            return None;
        }
        self.is_intermission = true;
        Some(Event::IntermissionOffered { at: at_ms(now_ms) })
    }

    pub fn finish_intermission(
        &mut self,
        action: IntermissionAction,
        next_mode: TimerMode,
        now_ms: u64,
        settings: &Settings,
    ) -> Option<Event> {
        self.is_intermission = false;
        match action {
            IntermissionAction::Extend => {
                self.reset_to(settings.flow_duration_secs());
                self.run(now_ms);
                tracing::debug!(secs = self.initial_secs, "session extended");
                Some(Event::SessionExtended {
                    duration_secs: self.initial_secs,
                    at: at_ms(now_ms),
                })
            }
            IntermissionAction::Break => {
                self.mode = next_mode;
                self.reset_to(settings.duration_secs(next_mode));
                if settings.auto_start_breaks {
                    self.run(now_ms);
                    Some(Event::TimerStarted {
                        mode: next_mode,
                        duration_secs: self.initial_secs,
                        at: at_ms(now_ms),
                    })
                } else {
                    self.is_active = false;
                    self.end_time_ms = None;
                    self.stop_loop();
                    Some(Event::ModeChanged {
                        mode: next_mode,
                        duration_secs: self.initial_secs,
                        at: at_ms(now_ms),
                    })
                }
            }
        }
    }

    /// Periodic check. Returns `Some(Event::TimerCompleted)` when the
    /// countdown reaches zero, `Some(Event::TimerTick)` when the
    /// whole-second remaining value drops, otherwise `None`.
    ///
    /// A completion carries the deadline as its `at`, not the time of the
    /// check that noticed it.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_active {
            return None;
        }
        let end = self.end_time_ms?;

        match whole_secs_left(end, now_ms) {
            None => {
                self.remaining_secs = 0;
                self.is_active = false;
                self.is_paused = false;
                self.end_time_ms = None;
                self.stop_loop();
                tracing::info!(mode = %self.mode, "session completed");
                Some(Event::TimerCompleted {
                    mode: self.mode,
                    is_focus: self.mode.is_focus(),
                    at: at_ms(end),
                })
            }
            Some(diff) if diff < self.remaining_secs => {
                self.remaining_secs = diff;
                Some(Event::TimerTick {
                    remaining_secs: diff,
                    progress_pct: self.progress_pct(),
                    at: at_ms(now_ms),
                })
            }
            Some(_) => None,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reset_to(&mut self, secs: u64) {
        self.remaining_secs = secs;
        self.initial_secs = secs;
        self.is_paused = false;
    }

    fn run(&mut self, now_ms: u64) {
        self.end_time_ms = Some(now_ms.saturating_add(self.remaining_secs.saturating_mul(1000)));
        self.is_active = true;
        self.is_paused = false;
        self.start_loop();
    }

    fn start_loop(&mut self) {
        // Starting a loop always supersedes the previous one.
        self.stop_loop();
        self.loop_armed = true;
        self.loop_generation += 1;
    }

    fn stop_loop(&mut self) {
        self.loop_armed = false;
    }
}

/// `ceil((end - now) / 1s)`, or `None` when that is zero or less.
fn whole_secs_left(end_ms: u64, now_ms: u64) -> Option<u64> {
    if end_ms <= now_ms {
        return None;
    }
    Some((end_ms - now_ms).div_ceil(1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn engine() -> (TimerEngine, Settings) {
        let settings = Settings::default();
        (TimerEngine::new(&settings), settings)
    }

    #[test]
    fn start_pause_resume() {
        let (mut engine, settings) = engine();
        assert_eq!(engine.state(), TimerState::Idle);

        assert!(engine.start(T0, &settings).is_some());
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.end_time_ms(), Some(T0 + 25 * 60 * 1000));

        assert!(engine.pause(T0 + 10_000).is_some());
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.end_time_ms(), None);
        assert_eq!(engine.remaining_secs(), 25 * 60 - 10);

        match engine.resume(T0 + 60_000, &settings) {
            Some(Event::TimerResumed { remaining_secs, .. }) => {
                assert_eq!(remaining_secs, 25 * 60 - 10)
            }
            other => panic!("expected TimerResumed, got {other:?}"),
        }
        assert_eq!(engine.end_time_ms(), Some(T0 + 60_000 + (25 * 60 - 10) * 1000));
    }

    #[test]
    fn start_while_running_is_noop() {
        let (mut engine, settings) = engine();
        engine.start(T0, &settings);
        let generation = engine.loop_generation();
        assert!(engine.start(T0 + 1, &settings).is_none());
        assert_eq!(engine.loop_generation(), generation);
    }

    #[test]
    fn tick_emits_only_on_whole_second_change() {
        let (mut engine, settings) = engine();
        engine.start_session(TimerMode::Short, T0, &settings);
        assert!(engine.tick(T0 + 200).is_none());
        assert!(engine.tick(T0 + 999).is_none());
        match engine.tick(T0 + 1_000) {
            Some(Event::TimerTick { remaining_secs, .. }) => assert_eq!(remaining_secs, 299),
            other => panic!("expected TimerTick, got {other:?}"),
        }
        assert!(engine.tick(T0 + 1_200).is_none());
    }

    #[test]
    fn completion_on_exact_end_forces_zero() {
        let (mut engine, settings) = engine();
        engine.start_session(TimerMode::Short, T0, &settings);
        let event = engine.tick(T0 + 300_000);
        assert!(matches!(
            event,
            Some(Event::TimerCompleted { mode: TimerMode::Short, is_focus: false, .. })
        ));
        assert_eq!(engine.remaining_secs(), 0);
        assert_eq!(engine.state(), TimerState::Idle);
        assert!(!engine.is_loop_armed());
        assert_eq!(engine.end_time_ms(), None);
        assert_eq!(engine.progress(), 1.0);
        // Completion fires once.
        assert!(engine.tick(T0 + 301_000).is_none());
    }

    #[test]
    fn late_tick_still_completes() {
        let (mut engine, settings) = engine();
        engine.start(T0, &settings);
        match engine.tick(T0 + 3_600_000) {
            Some(Event::TimerCompleted { is_focus: true, at, .. }) => {
                assert_eq!(at, at_ms(T0 + 25 * 60 * 1000));
            }
            other => panic!("expected TimerCompleted, got {other:?}"),
        }
    }

    #[test]
    fn oversized_duration_saturates_the_deadline() {
        let mut settings = Settings::default();
        settings.durations.focus = u64::MAX;
        let mut engine = TimerEngine::new(&settings);
        engine.start_session(TimerMode::Focus, T0, &settings);
        assert_eq!(engine.end_time_ms(), Some(u64::MAX));
        assert!(engine.tick(T0 + 1_000).is_some());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn set_mode_parks_without_starting() {
        let (mut engine, settings) = engine();
        engine.start(T0, &settings);
        engine.set_mode(TimerMode::Long, T0 + 5_000, &settings);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.mode(), TimerMode::Long);
        assert_eq!(engine.remaining_secs(), 15 * 60);
        assert_eq!(engine.progress(), 0.0);
        assert!(!engine.is_loop_armed());
    }

    #[test]
    fn starting_after_completion_rereads_duration() {
        let (mut engine, settings) = engine();
        engine.start_session(TimerMode::Short, T0, &settings);
        engine.tick(T0 + 300_000);
        engine.start(T0 + 400_000, &settings);
        assert_eq!(engine.remaining_secs(), 300);
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn intermission_extend_uses_flow_duration() {
        let (mut engine, settings) = engine();
        engine.start(T0, &settings);
        engine.tick(T0 + 25 * 60 * 1000);
        engine.enter_intermission(T0 + 25 * 60 * 1000);
        assert_eq!(engine.state(), TimerState::Intermission);
        assert!(!engine.sync_with_settings(&settings));

        engine.finish_intermission(IntermissionAction::Extend, TimerMode::Short, T0, &settings);
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.mode(), TimerMode::Focus);
        assert_eq!(engine.initial_secs(), 15 * 60);
    }

    #[test]
    fn intermission_break_respects_auto_start() {
        let (mut engine, mut settings) = engine();
        engine.finish_intermission(IntermissionAction::Break, TimerMode::Long, T0, &settings);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.mode(), TimerMode::Long);

        settings.auto_start_breaks = true;
        engine.finish_intermission(IntermissionAction::Break, TimerMode::Short, T0, &settings);
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.remaining_secs(), 5 * 60);
    }

    #[test]
    fn restarting_loop_bumps_generation() {
        let (mut engine, settings) = engine();
        engine.start(T0, &settings);
        let first = engine.loop_generation();
        engine.start_session(TimerMode::Focus, T0 + 10, &settings);
        assert!(engine.loop_generation() > first);
        assert!(engine.is_loop_armed());
    }

    #[test]
    fn zero_initial_has_zero_progress() {
        let mut settings = Settings::default();
        settings.durations.focus = 0;
        let engine = TimerEngine::new(&settings);
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn engine_survives_serde() {
        let (mut engine, settings) = engine();
        engine.start(T0, &settings);
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: TimerEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.state(), TimerState::Running);
        assert_eq!(restored.end_time_ms(), engine.end_time_ms());
        assert!(matches!(restored.tick(T0 + 25 * 60 * 1000), Some(Event::TimerCompleted { .. })));
    }
}
