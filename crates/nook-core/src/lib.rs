//! # Nook Core Library
//!
//! This library provides the core business logic for Nook, a Pomodoro timer
//! with a task list and a local analytics dashboard. Every operation is
//! available to the `nook` CLI binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` while a session is running
//! - **Orchestration**: Folds completion, pause and cancel events into statistics
//!   and task progress
//! - **State**: Observable stores for settings, tasks, stats, journal and media,
//!   each persisted as a whole slice to a key-value store
//! - **Storage**: SQLite-backed key-value store and TOML-based configuration
//! - **Sync**: One-way task import from the Todoist REST API
//!
//! ## Key Components
//!
//! - [`App`]: Owns every store and the timer; built from an injected store and clock
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerController`]: Timer orchestration
//! - [`Store`]: Observable state container
//! - [`Config`]: Application configuration management

pub mod context;
pub mod error;
pub mod events;
pub mod state;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod timer;

pub use context::App;
pub use error::{ConfigError, CoreError, StorageError, SyncError, ValidationError};
pub use events::Event;
pub use state::{Settings, StatsData, StatsState, Store, Subscription, Task, TaskState};
pub use stats::Dashboard;
pub use storage::{
    Config, KeyValueStore, KeyringSecrets, MemorySecrets, MemoryStore, SecretStore, SqliteStore,
};
pub use timer::{Clock, ManualClock, SystemClock, TimerController, TimerEngine, TimerMode, TimerState};
