//! One-way task synchronization from Todoist.

pub mod merge;
pub mod todoist;

pub use merge::{extract_category, merge_remote, remote_to_task, section_names};
pub use todoist::{RemoteSection, RemoteSnapshot, RemoteTask, TodoistClient};
