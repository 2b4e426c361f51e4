//! Observable state slices.
//!
//! Each slice is a plain record with its own load and persistence hook;
//! [`Store`] wraps one to provide updates and notifications.

mod container;
mod journal;
mod media;
mod settings;
mod stats;
mod tasks;

pub use container::{Persist, Store, Subscription};
pub use journal::{JournalEntry, JournalState};
pub use media::{BackgroundPreset, MediaKind, MediaState, Playlist};
pub use settings::{Durations, Settings};
pub use stats::{PauseBucket, PauseDist, SessionCounts, StatsData, StatsState};
pub use tasks::{NewTask, Task, TaskState};
