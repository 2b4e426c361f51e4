use std::time::Duration;

use clap::Subcommand;
use nook_core::{App, Config, Event, TimerMode, TimerState};

use super::{open_app, print_json, runtime, CmdResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a fresh session, or resume a paused one
    Start {
        /// Session mode (focus, short, long). Starts fresh when given.
        #[arg(long)]
        mode: Option<TimerMode>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop and reset the current session
    Cancel,
    /// Switch mode without starting
    Mode {
        /// focus, short or long
        mode: TimerMode,
    },
    /// Extend the finished focus session
    Extend,
    /// Take the break offered after a focus session
    Break,
    /// Print current timer state as JSON
    Status,
    /// Drive the countdown in the foreground until it stops
    Run,
}

fn print_event(event: Option<Event>, app: &App) -> CmdResult {
    match event {
        Some(event) => print_json(&event),
        // Nothing changed; show where things stand.
        None => print_json(&app.timer_snapshot()),
    }
}

pub fn run(action: TimerAction) -> CmdResult {
    let app = open_app()?;

    match action {
        TimerAction::Start { mode: Some(mode) } => print_event(app.start_session(mode), &app)?,
        TimerAction::Start { mode: None } => print_event(app.start(), &app)?,
        TimerAction::Pause => print_event(app.pause_session(), &app)?,
        TimerAction::Resume => {
            let paused = app.timer().engine.state() == TimerState::Paused;
            if paused {
                print_event(app.start(), &app)?;
            } else {
                print_json(&app.timer_snapshot())?;
            }
        }
        TimerAction::Cancel => print_event(app.cancel_session(), &app)?,
        TimerAction::Mode { mode } => print_event(app.set_mode(mode), &app)?,
        TimerAction::Extend => {
            if !app.timer().engine.is_intermission() {
                return Err("no finished focus session to extend".into());
            }
            print_event(app.extend_session(), &app)?;
        }
        TimerAction::Break => {
            if !app.timer().engine.is_intermission() {
                return Err("no finished focus session to take a break from".into());
            }
            print_event(app.finish_session(), &app)?;
        }
        TimerAction::Status => print_json(&app.timer_snapshot())?,
        TimerAction::Run => {
            let check_ms = Config::load_or_default().timer.check_interval_ms.max(10);
            runtime()?.block_on(drive(&app, Duration::from_millis(check_ms)))?;
        }
    }

    app.save_timer()?;
    Ok(())
}

/// Tick on a fixed interval while a countdown loop is armed.
///
/// Completions that start another session (auto-started breaks) keep the
/// driver going; an intermission or an idle engine ends it.
async fn drive(app: &App, every: Duration) -> CmdResult {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut generation = app.timer().engine.loop_generation();
    loop {
        ticker.tick().await;
        for event in app.tick() {
            print_json(&event)?;
        }

        let timer = app.timer();
        if timer.engine.loop_generation() != generation {
            tracing::debug!(generation = timer.engine.loop_generation(), "countdown restarted");
            generation = timer.engine.loop_generation();
        }
        if timer.engine.is_intermission() {
            eprintln!("focus session done: run `nook timer extend` or `nook timer break`");
            break;
        }
        if !timer.engine.is_loop_armed() {
            break;
        }
    }
    Ok(())
}
