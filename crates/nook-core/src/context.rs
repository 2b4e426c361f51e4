//! Application context.
//!
//! [`App`] owns every state store and the timer orchestration. It is built
//! from an injected key-value store, secret store and clock, so the CLI runs
//! against SQLite, the OS keyring and the wall clock while tests use memory
//! and a manual clock.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{CoreError, SyncError};
use crate::events::{at_ms, Event};
use crate::state::{
    JournalEntry, JournalState, MediaState, NewTask, Settings, StatsState, Store, TaskState,
};
use crate::stats::Dashboard;
use crate::storage::{self, keys, secrets, KeyValueStore, MemorySecrets, SecretStore};
use crate::sync::{merge_remote, remote_to_task, section_names, RemoteSnapshot, TodoistClient};
use crate::timer::{Clock, SessionContext, TimerController, TimerMode};

pub struct App {
    kv: Rc<dyn KeyValueStore>,
    secrets: Rc<dyn SecretStore>,
    clock: Rc<dyn Clock>,
    pub settings: Store<Settings>,
    pub stats: Store<StatsState>,
    pub tasks: Store<TaskState>,
    pub journal: Store<JournalState>,
    pub media: Store<MediaState>,
    timer: RefCell<TimerController>,
}

impl App {
    /// Load every slice from `kv`, keeping credentials in memory only.
    pub fn new(kv: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        Self::with_secrets(kv, Rc::new(MemorySecrets::new()), clock)
    }

    /// Load every slice from `kv` and the API token from `secrets`.
    pub fn with_secrets(
        kv: Rc<dyn KeyValueStore>,
        secrets: Rc<dyn SecretStore>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let now = clock.now().with_timezone(&Utc);
        let settings = Settings::load(kv.as_ref());
        let timer = storage::load_or(kv.as_ref(), keys::TIMER, TimerController::new(&settings));
        let mut tasks = TaskState::load(kv.as_ref());
        tasks.todoist_token = load_token(kv.as_ref(), secrets.as_ref());

        Self {
            stats: Store::persisted(StatsState::load(kv.as_ref(), now), Rc::clone(&kv)),
            tasks: Store::persisted(tasks, Rc::clone(&kv)),
            journal: Store::persisted(JournalState::load(kv.as_ref()), Rc::clone(&kv)),
            media: Store::persisted(MediaState::load(kv.as_ref()), Rc::clone(&kv)),
            settings: Store::persisted(settings, Rc::clone(&kv)),
            timer: RefCell::new(timer),
            kv,
            secrets,
            clock,
        }
    }

    pub fn kv(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn timer(&self) -> Ref<'_, TimerController> {
        self.timer.borrow()
    }

    /// Run a timer transition against the current stores, then persist it.
    fn with_timer<R>(&self, f: impl FnOnce(&mut TimerController, &SessionContext<'_>) -> R) -> R {
        let settings = self.settings.get_state();
        let ctx = SessionContext {
            settings: &settings,
            stats: &self.stats,
            tasks: &self.tasks,
            now: self.clock.now(),
        };
        let result = {
            let mut timer = self.timer.borrow_mut();
            f(&mut timer, &ctx)
        };
        if let Err(e) = self.save_timer() {
            tracing::warn!(error = %e, "failed to persist timer");
        }
        result
    }

    pub fn save_timer(&self) -> Result<(), CoreError> {
        storage::save(self.kv.as_ref(), keys::TIMER, &*self.timer.borrow())
    }

    /// The periodic check: completion and tick events since the last call.
    pub fn tick(&self) -> Vec<Event> {
        self.with_timer(|timer, ctx| timer.tick(ctx))
    }

    pub fn start_session(&self, mode: TimerMode) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.start_session(mode, ctx))
    }

    pub fn start(&self) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.start(ctx))
    }

    pub fn pause_session(&self) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.pause_session(ctx))
    }

    pub fn cancel_session(&self) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.cancel_session(ctx))
    }

    pub fn set_mode(&self, mode: TimerMode) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.set_mode(mode, ctx))
    }

    pub fn finish_session(&self) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.finish_session(ctx))
    }

    pub fn extend_session(&self) -> Option<Event> {
        self.with_timer(|timer, ctx| timer.extend_session(ctx))
    }

    pub fn timer_snapshot(&self) -> Event {
        self.timer.borrow().snapshot(self.now_ms())
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Set one setting by dotted camelCase key. An idle timer picks up the
    /// new duration immediately.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<Settings, CoreError> {
        let next = self.settings.get_state().with_value(key, value)?;
        self.settings.replace(next.clone());
        self.with_timer(|timer, _| timer.engine.sync_with_settings(&next));
        Ok(next)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn add_task(&self, mut new: NewTask) -> Result<String, CoreError> {
        let now = self.now().with_timezone(&Utc);
        let syncing = self.tasks.with_state(|t| !t.todoist_token.is_empty());
        new.text = new.text.trim().to_string();
        let id = self.tasks.set_state(|t| {
            let id = t.add_task(new, now)?;
            if syncing {
                if let Some(task) = t.tasks.iter_mut().find(|task| task.id == id) {
                    task.is_syncing = true;
                }
            }
            Ok::<_, CoreError>(id)
        })?;
        Ok(id)
    }

    /// Flip completion; completing a task bumps the tasks-completed counter.
    pub fn toggle_task(&self, id: &str) -> Result<bool, CoreError> {
        let completed = self.tasks.set_state(|t| t.toggle_task(id))?;
        if completed {
            self.stats.set_state(|s| s.stats.tasks_completed += 1);
        }
        Ok(completed)
    }

    pub fn delete_task(&self, id: &str) -> Result<(), CoreError> {
        let now_ms = self.now().timestamp_millis();
        self.tasks.set_state(|t| t.delete_task(id, now_ms))?;
        Ok(())
    }

    pub fn archive_completed(&self) -> usize {
        let now_ms = self.now().timestamp_millis();
        self.tasks.set_state(|t| t.archive_completed(now_ms))
    }

    pub fn restore_task(&self, id: &str) -> Result<(), CoreError> {
        self.tasks.set_state(|t| t.restore_task(id))?;
        Ok(())
    }

    pub fn set_focused_task(&self, id: Option<&str>) -> Result<(), CoreError> {
        self.tasks.set_state(|t| t.set_focused_task(id))?;
        Ok(())
    }

    /// Store the API token in the secret store; an empty token clears it.
    pub fn set_token(&self, token: &str) -> Result<(), CoreError> {
        let token = token.trim();
        if token.is_empty() {
            self.secrets.delete(secrets::TODOIST_TOKEN)?;
        } else {
            self.secrets.set(secrets::TODOIST_TOKEN, token)?;
        }
        self.kv.remove(keys::LEGACY_TODOIST_TOKEN)?;
        self.tasks.set_state(|t| t.set_token(token));
        Ok(())
    }

    pub fn clear_archive(&self) -> usize {
        self.tasks.set_state(|t| t.clear_archive())
    }

    // ── Journal ──────────────────────────────────────────────────────

    pub fn add_journal_entry(&self, text: &str) -> Result<JournalEntry, CoreError> {
        let now = self.now().with_timezone(&Utc);
        let entry = self
            .journal
            .set_state(|j| j.add_entry(text, now).map(Clone::clone))?;
        Ok(entry)
    }

    // ── Analytics ────────────────────────────────────────────────────

    pub fn dashboard(&self) -> Dashboard {
        let goal = self.settings.with_state(|s| s.daily_goal);
        let now = self.now();
        self.stats.with_state(|stats| {
            self.tasks.with_state(|tasks| {
                let all: Vec<_> = tasks.all_tasks().collect();
                Dashboard::compute(&stats.stats, &all, goal, now)
            })
        })
    }

    // ── Sync ─────────────────────────────────────────────────────────

    /// Claim the in-flight flag and build a client for one poll.
    pub fn begin_sync(&self, base_url: &str) -> Result<TodoistClient, SyncError> {
        let (token, in_flight) = self
            .tasks
            .with_state(|t| (t.todoist_token.clone(), t.is_syncing));
        if token.is_empty() {
            return Err(SyncError::MissingToken);
        }
        if in_flight {
            return Err(SyncError::AlreadyRunning);
        }
        let client = TodoistClient::new(base_url, &token)?;
        self.tasks.set_state(|t| t.is_syncing = true);
        Ok(client)
    }

    /// Apply a poll's outcome and release the in-flight flag.
    pub fn complete_sync(&self, result: Result<RemoteSnapshot, SyncError>) -> Event {
        let at = at_ms(self.now_ms());
        match result {
            Ok(snapshot) => {
                // A failed sections request keeps the last good map.
                let sections: HashMap<String, String> = match &snapshot.sections {
                    Some(fresh) => section_names(fresh),
                    None => self.tasks.with_state(|t| {
                        t.todoist_sections
                            .iter()
                            .map(|(name, id)| (id.clone(), name.clone()))
                            .collect()
                    }),
                };
                let fetched = snapshot.tasks.len();
                let remote: Vec<_> = snapshot
                    .tasks
                    .into_iter()
                    .map(|r| remote_to_task(r, &sections))
                    .collect();
                let total = self.tasks.set_state(|t| {
                    if let Some(fresh) = &snapshot.sections {
                        t.todoist_sections = fresh
                            .iter()
                            .map(|s| (s.name.clone(), s.id.clone()))
                            .collect();
                    }
                    t.tasks = merge_remote(&t.tasks, remote);
                    t.is_syncing = false;
                    t.tasks.len()
                });
                tracing::info!(fetched, total, "tasks synced");
                Event::TasksSynced { fetched, total, at }
            }
            Err(e) => {
                tracing::warn!(error = %e, "task sync failed");
                self.tasks.set_state(|t| t.is_syncing = false);
                Event::SyncFailed {
                    message: e.to_string(),
                    at,
                }
            }
        }
    }

    /// One full poll. Fails only when a poll cannot start.
    pub async fn sync_now(&self, base_url: &str) -> Result<Event, SyncError> {
        let client = self.begin_sync(base_url)?;
        let result = client.fetch_snapshot().await;
        Ok(self.complete_sync(result))
    }
}

/// Read the API token, moving a plaintext copy left in `kv` into `vault`.
///
/// A secret store that cannot be reached leaves sync without a token.
fn load_token(kv: &dyn KeyValueStore, vault: &dyn SecretStore) -> String {
    match vault.get(secrets::TODOIST_TOKEN) {
        Ok(Some(token)) => return token,
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "could not read API token from the credential store");
            return String::new();
        }
    }

    let legacy: String = storage::load_or(kv, keys::LEGACY_TODOIST_TOKEN, String::new());
    if legacy.is_empty() {
        return String::new();
    }
    match vault.set(secrets::TODOIST_TOKEN, &legacy) {
        Ok(()) => {
            if let Err(e) = kv.remove(keys::LEGACY_TODOIST_TOKEN) {
                tracing::warn!(error = %e, "could not remove plaintext API token");
            } else {
                tracing::info!("moved API token into the credential store");
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not move API token into the credential store"),
    }
    legacy
}
