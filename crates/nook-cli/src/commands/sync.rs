//! Task import from Todoist.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use clap::Subcommand;
use nook_core::sync::RemoteSnapshot;
use nook_core::{App, Config, Event, SyncError};

use super::{open_app, print_json, runtime, CmdResult};

type Poll = Pin<Box<dyn Future<Output = Result<RemoteSnapshot, SyncError>>>>;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Store the API token in the OS keyring; pass an empty string to clear it
    Token {
        token: String,
    },
    /// Import tasks once
    Now,
    /// Poll for tasks and drive the timer until interrupted
    Watch,
}

pub fn run(action: SyncAction) -> CmdResult {
    let app = open_app()?;
    let config = Config::load_or_default();

    match action {
        SyncAction::Token { token } => {
            app.set_token(&token)?;
            if token.trim().is_empty() {
                println!("token cleared");
            } else {
                println!("token saved");
            }
        }
        SyncAction::Now => {
            let event = runtime()?.block_on(app.sync_now(&config.sync.api_base_url))?;
            let failed = matches!(event, Event::SyncFailed { .. });
            print_json(&event)?;
            if failed {
                return Err("sync failed".into());
            }
        }
        SyncAction::Watch => runtime()?.block_on(watch(&app, &config))?,
    }
    Ok(())
}

/// Poll on one interval and tick the timer on another.
///
/// A poll that is still in flight when the next one is due makes the
/// next one a no-op.
async fn watch(app: &App, config: &Config) -> CmdResult {
    let mut poll = tokio::time::interval(Duration::from_secs(config.sync.poll_interval_secs.max(1)));
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut check = tokio::time::interval(Duration::from_millis(config.timer.check_interval_ms.max(10)));
    check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let base = config.sync.api_base_url.clone();
    let mut in_flight: Option<Poll> = None;

    loop {
        tokio::select! {
            _ = poll.tick() => match app.begin_sync(&base) {
                Ok(client) => {
                    let fut: Poll = Box::pin(async move { client.fetch_snapshot().await });
                    in_flight = Some(fut);
                }
                Err(SyncError::AlreadyRunning) => {
                    tracing::debug!("previous poll still running, skipping");
                }
                Err(e) => return Err(e.into()),
            },
            result = async {
                match in_flight.as_mut() {
                    Some(fut) => fut.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                print_json(&app.complete_sync(result))?;
            }
            _ = check.tick() => {
                for event in app.tick() {
                    if !matches!(event, Event::TimerTick { .. }) {
                        print_json(&event)?;
                    }
                }
            }
        }
    }
}
