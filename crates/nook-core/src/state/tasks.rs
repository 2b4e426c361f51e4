//! Task list state.
//!
//! A task lives in exactly one of `tasks` (active) or `archived_tasks`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::container::Persist;
use crate::error::{CoreError, ValidationError};
use crate::storage::{self, keys, KeyValueStore};

fn default_priority() -> u8 {
    1
}

fn default_category() -> String {
    "General".into()
}

fn default_estimate() -> u32 {
    1
}

/// Ids written by older versions may be numbers.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub text: String,
    /// 1 (normal) to 4 (urgent).
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_syncing: bool,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default = "default_estimate")]
    pub estimated_pomos: u32,
    #[serde(default)]
    pub completed_pomos: u32,
    /// RFC 3339 timestamp. Kept as text so one bad value never sinks the list.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
}

impl Task {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            priority: default_priority(),
            category: default_category(),
            completed: false,
            is_syncing: false,
            due_date: None,
            estimated_pomos: default_estimate(),
            completed_pomos: 0,
            created_at: None,
            archived_at: None,
        }
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
            .map(|c| c.with_timezone(&Utc))
    }
}

/// Fields for a locally created task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub text: String,
    pub category: Option<String>,
    pub priority: Option<u8>,
    pub estimated_pomos: Option<u32>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub archived_tasks: Vec<Task>,
    pub focused_task_id: Option<String>,
    /// Held in memory only; the keyring is the durable copy.
    pub todoist_token: String,
    pub is_syncing: bool,
    /// Section name to section id, from the last successful fetch.
    pub todoist_sections: BTreeMap<String, String>,
}

fn not_found(id: &str) -> ValidationError {
    ValidationError::NotFound {
        kind: "task",
        id: id.to_string(),
    }
}

impl TaskState {
    pub fn load(kv: &dyn KeyValueStore) -> Self {
        Self {
            tasks: storage::load_or(kv, keys::TASKS, Vec::new()),
            archived_tasks: storage::load_or(kv, keys::ARCHIVED_TASKS, Vec::new()),
            focused_task_id: storage::load_or(kv, keys::FOCUSED_TASK, None),
            todoist_token: String::new(),
            is_syncing: false,
            todoist_sections: BTreeMap::new(),
        }
    }

    pub fn focused_task(&self) -> Option<&Task> {
        let id = self.focused_task_id.as_deref()?;
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Active and archived tasks together.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().chain(self.archived_tasks.iter())
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Append a local task and return its id.
    pub fn add_task(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<String, ValidationError> {
        let text = new.text.trim();
        if text.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "text".into(),
                message: "must not be empty".into(),
            });
        }
        let priority = new.priority.unwrap_or(1);
        if !(1..=4).contains(&priority) {
            return Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("{priority} is not between 1 and 4"),
            });
        }

        let mut task = Task::new(uuid::Uuid::new_v4().to_string(), text);
        task.priority = priority;
        if let Some(category) = new.category.filter(|c| !c.trim().is_empty()) {
            task.category = category.trim().to_string();
        }
        task.estimated_pomos = new.estimated_pomos.unwrap_or(1).max(1);
        task.due_date = new.due_date.map(|d| d.format("%Y-%m-%d").to_string());
        task.created_at = Some(now.to_rfc3339());

        let id = task.id.clone();
        self.tasks.push(task);
        Ok(id)
    }

    /// Flip completion. Returns the new completed flag.
    pub fn toggle_task(&mut self, id: &str) -> Result<bool, ValidationError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    /// Archive an active task; permanently drop one already archived.
    pub fn delete_task(&mut self, id: &str, now_ms: i64) -> Result<(), ValidationError> {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            let mut task = self.tasks.remove(pos);
            if !self.archived_tasks.iter().any(|a| a.id == id) {
                task.archived_at = Some(now_ms);
                self.archived_tasks.push(task);
            }
            if self.focused_task_id.as_deref() == Some(id) {
                self.focused_task_id = None;
            }
            return Ok(());
        }

        let before = self.archived_tasks.len();
        self.archived_tasks.retain(|t| t.id != id);
        if self.archived_tasks.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Archive every completed active task. Returns how many moved.
    pub fn archive_completed(&mut self, now_ms: i64) -> usize {
        let ids: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.clone())
            .collect();
        for id in &ids {
            // Present in `tasks` by construction.
            let _ = self.delete_task(id, now_ms);
        }
        ids.len()
    }

    pub fn restore_task(&mut self, id: &str) -> Result<(), ValidationError> {
        let pos = self
            .archived_tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        let mut task = self.archived_tasks.remove(pos);
        task.archived_at = None;
        if !self.tasks.iter().any(|t| t.id == id) {
            self.tasks.push(task);
        }
        Ok(())
    }

    pub fn set_focused_task(&mut self, id: Option<&str>) -> Result<(), ValidationError> {
        match id {
            Some(id) if self.find(id).is_none() => Err(not_found(id)),
            Some(id) => {
                self.focused_task_id = Some(id.to_string());
                Ok(())
            }
            None => {
                self.focused_task_id = None;
                Ok(())
            }
        }
    }

    pub fn set_token(&mut self, token: &str) {
        self.todoist_token = token.trim().to_string();
    }

    pub fn clear_archive(&mut self) -> usize {
        std::mem::take(&mut self.archived_tasks).len()
    }

    /// Credit one pomodoro to the focused task, if any.
    pub fn credit_focused_pomodoro(&mut self) -> Option<&Task> {
        let id = self.focused_task_id.clone()?;
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed_pomos += 1;
        Some(task)
    }
}

impl Persist for TaskState {
    fn persist(&self, prev: &Self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        if self.tasks != prev.tasks {
            storage::save(kv, keys::TASKS, &self.tasks)?;
        }
        if self.archived_tasks != prev.archived_tasks {
            storage::save(kv, keys::ARCHIVED_TASKS, &self.archived_tasks)?;
        }
        if self.focused_task_id != prev.focused_task_id {
            match &self.focused_task_id {
                Some(id) => storage::save(kv, keys::FOCUSED_TASK, id)?,
                None => kv.remove(keys::FOCUSED_TASK)?,
            }
        }
        Ok(())
    }
}
