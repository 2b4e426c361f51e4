//! Timer orchestration.
//!
//! Couples the [`TimerEngine`] to the stats and task slices: completion
//! events are folded into statistics, pauses are bucketed, and the
//! extend-or-break intermission is resolved here.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::{IntermissionAction, TimerEngine, TimerMode};
use crate::events::{at_ms, Event};
use crate::state::{Settings, StatsState, Store, TaskState};
use crate::stats::{fold, FocusCredit};

/// Orchestration flags carried between completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerFlags {
    /// The extend-or-break choice is pending.
    pub show_flow_extend: bool,
    /// The running (or just finished) focus session is a flow extension.
    pub is_extension: bool,
    /// The current pause already counted this session as abandoned.
    pub abandon_counted: bool,
}

/// Everything a transition may read or update, at one instant.
pub struct SessionContext<'a> {
    pub settings: &'a Settings,
    pub stats: &'a Store<StatsState>,
    pub tasks: &'a Store<TaskState>,
    pub now: DateTime<FixedOffset>,
}

impl SessionContext<'_> {
    fn now_ms(&self) -> u64 {
        self.now.timestamp_millis().max(0) as u64
    }

    /// Whether the focused task (if any) is still open.
    fn focused_task_open(&self) -> bool {
        !self
            .tasks
            .with_state(|t| t.focused_task().is_some_and(|task| task.completed))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerController {
    pub engine: TimerEngine,
    #[serde(default)]
    pub flags: TimerFlags,
}

impl TimerController {
    pub fn new(settings: &Settings) -> Self {
        Self {
            engine: TimerEngine::new(settings),
            flags: TimerFlags::default(),
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> Event {
        self.engine.snapshot(self.flags.is_extension, now_ms)
    }

    /// Run the periodic check and, on completion, the orchestration.
    pub fn tick(&mut self, ctx: &SessionContext<'_>) -> Vec<Event> {
        match self.engine.tick(ctx.now_ms()) {
            Some(Event::TimerCompleted { mode, is_focus, at }) => {
                let mut events = vec![Event::TimerCompleted { mode, is_focus, at }];
                events.extend(self.handle_completion(mode, is_focus, at, ctx));
                events
            }
            Some(event) => vec![event],
            None => Vec::new(),
        }
    }

    /// Fold one finished session into stats and tasks, then pick the next state.
    ///
    /// Minutes land on the day and hour of `ended_at` in the local offset,
    /// even when the completion is only noticed later.
    pub fn handle_completion(
        &mut self,
        mode: TimerMode,
        is_focus: bool,
        ended_at: DateTime<Utc>,
        ctx: &SessionContext<'_>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let now_ms = ctx.now_ms();
        self.flags.abandon_counted = false;

        if is_focus {
            self.flags.show_flow_extend = true;
            events.extend(self.engine.enter_intermission(now_ms));

            let is_extension = self.flags.is_extension;
            let minutes = if is_extension {
                ctx.settings.flow_duration
            } else {
                ctx.settings.durations.focus
            };
            let (category, priority) = ctx.tasks.with_state(|t| {
                t.focused_task()
                    .map(|task| (task.category.clone(), task.priority))
                    .unzip()
            });
            let credit = category.as_deref().zip(priority).map(|(category, priority)| FocusCredit {
                category,
                priority,
            });

            let folded = ctx.stats.set_state(|s| {
                fold::record_session_count(&mut s.stats, mode);
                if !is_extension {
                    s.stats.sessions += 1;
                    s.seeds += 1;
                }
                fold::fold_focus(
                    &mut s.stats,
                    minutes,
                    ended_at.with_timezone(ctx.now.offset()).naive_local(),
                    ctx.settings.daily_goal,
                    credit,
                )
            });
            tracing::info!(
                minutes,
                today = folded.today_minutes,
                streak = folded.streak,
                perfect_day = folded.perfect_day,
                "focus session folded into stats"
            );

            if !is_extension {
                ctx.tasks.set_state(|t| {
                    t.credit_focused_pomodoro();
                });
            }
        } else {
            ctx.stats.set_state(|s| {
                fold::record_session_count(&mut s.stats, mode);
                s.stats.breaks_completed += 1;
            });

            if ctx.settings.auto_start_breaks && mode == TimerMode::Short {
                events.extend(self.engine.start_session(TimerMode::Focus, now_ms, ctx.settings));
            } else if mode == TimerMode::Long {
                events.extend(self.engine.set_mode(TimerMode::Focus, now_ms, ctx.settings));
            }
        }
        events
    }

    /// User-started session in `mode`.
    pub fn start_session(&mut self, mode: TimerMode, ctx: &SessionContext<'_>) -> Option<Event> {
        self.flags = TimerFlags::default();
        self.engine.start_session(mode, ctx.now_ms(), ctx.settings)
    }

    /// Start or resume from the current remaining time.
    pub fn start(&mut self, ctx: &SessionContext<'_>) -> Option<Event> {
        if self.engine.is_intermission() {
            return None;
        }
        let event = self.engine.start(ctx.now_ms(), ctx.settings);
        if event.is_some() {
            self.flags.abandon_counted = false;
        }
        event
    }

    pub fn set_mode(&mut self, mode: TimerMode, ctx: &SessionContext<'_>) -> Option<Event> {
        self.flags = TimerFlags::default();
        self.engine.set_mode(mode, ctx.now_ms(), ctx.settings)
    }

    /// Pause, recording a mid-focus interruption.
    pub fn pause_session(&mut self, ctx: &SessionContext<'_>) -> Option<Event> {
        if self.engine.mode().is_focus() && self.engine.is_active() {
            let progress = self.engine.progress_pct();
            let abandoned = ctx.focused_task_open();
            let bucket = ctx
                .stats
                .set_state(|s| fold::record_pause(&mut s.stats, progress, abandoned));
            self.flags.abandon_counted = abandoned;
            tracing::debug!(progress, ?bucket, abandoned, "focus paused");
        }
        self.engine.pause(ctx.now_ms())
    }

    /// Stop and reset to the same mode.
    ///
    /// A focus session with an open task counts as abandoned, unless the
    /// pause that preceded this cancel already counted it.
    pub fn cancel_session(&mut self, ctx: &SessionContext<'_>) -> Option<Event> {
        let now_ms = ctx.now_ms();
        let mode = self.engine.mode();
        self.engine.pause(now_ms);
        self.engine.set_mode(mode, now_ms, ctx.settings);

        if mode.is_focus() && ctx.focused_task_open() && !self.flags.abandon_counted {
            ctx.stats.set_state(|s| s.stats.abandoned_sessions += 1);
        }
        self.flags = TimerFlags::default();
        tracing::debug!(%mode, "session cancelled");
        Some(Event::TimerCancelled {
            mode,
            at: at_ms(now_ms),
        })
    }

    /// Resolve the intermission by taking a break.
    pub fn finish_session(&mut self, ctx: &SessionContext<'_>) -> Option<Event> {
        self.flags.show_flow_extend = false;
        self.flags.is_extension = false;

        let sessions = ctx.stats.with_state(|s| s.stats.sessions);
        let next = if fold::is_long_break(sessions, ctx.settings.long_break_interval) {
            TimerMode::Long
        } else {
            TimerMode::Short
        };
        self.engine
            .finish_intermission(IntermissionAction::Break, next, ctx.now_ms(), ctx.settings)
    }

    /// Resolve the intermission by extending the focus session.
    pub fn extend_session(&mut self, ctx: &SessionContext<'_>) -> Option<Event> {
        self.flags.show_flow_extend = false;
        self.flags.is_extension = true;
        let event = self.engine.finish_intermission(
            IntermissionAction::Extend,
            TimerMode::Focus,
            ctx.now_ms(),
            ctx.settings,
        );
        ctx.stats.set_state(|s| s.stats.flow_extensions += 1);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NewTask;
    use crate::timer::TimerState;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        settings: Settings,
        stats: Store<StatsState>,
        tasks: Store<TaskState>,
        now: DateTime<FixedOffset>,
    }

    impl Fixture {
        fn new() -> Self {
            let now = FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2026, 3, 10, 14, 0, 0)
                .unwrap();
            Self {
                settings: Settings::default(),
                stats: Store::new(StatsState::fresh(Utc::now())),
                tasks: Store::new(TaskState::default()),
                now,
            }
        }

        fn ctx(&self) -> SessionContext<'_> {
            SessionContext {
                settings: &self.settings,
                stats: &self.stats,
                tasks: &self.tasks,
                now: self.now,
            }
        }

        fn advance(&mut self, secs: i64) {
            self.now += Duration::seconds(secs);
        }
    }

    fn complete_focus(fx: &mut Fixture, timer: &mut TimerController) -> Vec<Event> {
        timer.start_session(TimerMode::Focus, &fx.ctx());
        fx.advance(25 * 60);
        timer.tick(&fx.ctx())
    }

    #[test]
    fn focus_completion_offers_intermission_and_folds() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        let events = complete_focus(&mut fx, &mut timer);

        assert!(matches!(events[0], Event::TimerCompleted { is_focus: true, .. }));
        assert!(events.iter().any(|e| matches!(e, Event::IntermissionOffered { .. })));
        assert!(timer.flags.show_flow_extend);
        assert_eq!(timer.engine.state(), TimerState::Intermission);

        let s = fx.stats.get_state();
        assert_eq!(s.stats.sessions, 1);
        assert_eq!(s.seeds, 1);
        assert_eq!(s.stats.session_counts.focus, 1);
        assert_eq!(s.stats.minutes, 25);
        assert_eq!(s.stats.hourly_activity[14], 25);
    }

    #[test]
    fn late_completion_is_folded_at_the_deadline() {
        let mut fx = Fixture::new();
        fx.now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 9, 23, 30, 0)
            .unwrap();
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Focus, &fx.ctx());
        // Noticed the next morning.
        fx.advance(9 * 3600 + 30 * 60);
        timer.tick(&fx.ctx());

        let s = fx.stats.get_state();
        assert_eq!(s.stats.daily_history.get("2026-03-09"), Some(&25));
        assert_eq!(s.stats.daily_history.get("2026-03-10"), None);
        assert_eq!(s.stats.hourly_activity[23], 25);
        assert_eq!(s.stats.hourly_activity[9], 0);
    }

    #[test]
    fn extension_credits_flow_minutes_without_a_session() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        complete_focus(&mut fx, &mut timer);

        timer.extend_session(&fx.ctx());
        assert_eq!(timer.engine.initial_secs(), 15 * 60);
        fx.advance(15 * 60);
        timer.tick(&fx.ctx());

        let s = fx.stats.get_state();
        assert_eq!(s.stats.sessions, 1);
        assert_eq!(s.seeds, 1);
        assert_eq!(s.stats.minutes, 40);
        assert_eq!(s.stats.flow_extensions, 1);
        assert_eq!(s.stats.session_counts.focus, 2);
    }

    #[test]
    fn focused_task_gets_pomodoro_and_attribution() {
        let mut fx = Fixture::new();
        let id = fx.tasks.set_state(|t| {
            let id = t
                .add_task(
                    NewTask {
                        text: "essay".into(),
                        category: Some("Study".into()),
                        priority: Some(3),
                        ..NewTask::default()
                    },
                    Utc::now(),
                )
                .unwrap();
            t.set_focused_task(Some(&id)).unwrap();
            id
        });
        let mut timer = TimerController::new(&fx.settings);
        complete_focus(&mut fx, &mut timer);

        assert_eq!(fx.tasks.with_state(|t| t.find(&id).unwrap().completed_pomos), 1);
        let s = fx.stats.get_state();
        assert_eq!(s.stats.category_dist.get("Study"), Some(&25));
        assert_eq!(s.stats.priority_dist.get(&3), Some(&25));
    }

    #[test]
    fn finish_session_picks_long_break_on_interval() {
        let mut fx = Fixture::new();
        fx.stats.set_state(|s| s.stats.sessions = 3);
        let mut timer = TimerController::new(&fx.settings);
        complete_focus(&mut fx, &mut timer);
        timer.finish_session(&fx.ctx());
        assert_eq!(timer.engine.mode(), TimerMode::Long);
        assert_eq!(timer.engine.state(), TimerState::Idle);
        assert!(!timer.flags.show_flow_extend);
    }

    #[test]
    fn short_break_auto_starts_focus() {
        let mut fx = Fixture::new();
        fx.settings.auto_start_breaks = true;
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Short, &fx.ctx());
        fx.advance(5 * 60);
        timer.tick(&fx.ctx());
        assert_eq!(timer.engine.mode(), TimerMode::Focus);
        assert_eq!(timer.engine.state(), TimerState::Running);
        assert_eq!(fx.stats.with_state(|s| s.stats.breaks_completed), 1);
    }

    #[test]
    fn long_break_returns_to_configured_focus() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Long, &fx.ctx());
        fx.advance(15 * 60);
        timer.tick(&fx.ctx());
        assert_eq!(timer.engine.mode(), TimerMode::Focus);
        assert_eq!(timer.engine.state(), TimerState::Idle);
        assert_eq!(timer.engine.remaining_secs(), 25 * 60);
    }

    #[test]
    fn pause_buckets_progress_and_counts_abandonment() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Focus, &fx.ctx());
        fx.advance(20 * 60);
        timer.tick(&fx.ctx());
        timer.pause_session(&fx.ctx());

        let s = fx.stats.get_state().stats;
        assert_eq!(s.total_pauses, 1);
        assert_eq!(s.pause_dist.last_quarter, 1);
        assert_eq!(s.abandoned_sessions, 1);
        assert_eq!(timer.engine.state(), TimerState::Paused);
    }

    #[test]
    fn cancel_after_pause_counts_abandonment_once() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Focus, &fx.ctx());
        fx.advance(60);
        timer.pause_session(&fx.ctx());
        timer.cancel_session(&fx.ctx());
        assert_eq!(fx.stats.with_state(|s| s.stats.abandoned_sessions), 1);
        assert_eq!(timer.engine.state(), TimerState::Idle);
        assert_eq!(timer.engine.remaining_secs(), 25 * 60);
    }

    #[test]
    fn cancel_without_pause_counts_abandonment() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Focus, &fx.ctx());
        timer.cancel_session(&fx.ctx());
        let s = fx.stats.get_state().stats;
        assert_eq!(s.abandoned_sessions, 1);
        assert_eq!(s.total_pauses, 0);
    }

    #[test]
    fn pausing_a_break_records_nothing() {
        let mut fx = Fixture::new();
        let mut timer = TimerController::new(&fx.settings);
        timer.start_session(TimerMode::Short, &fx.ctx());
        timer.pause_session(&fx.ctx());
        timer.cancel_session(&fx.ctx());
        let s = fx.stats.get_state().stats;
        assert_eq!(s.total_pauses, 0);
        assert_eq!(s.abandoned_sessions, 0);
    }
}
