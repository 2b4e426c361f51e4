use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::container::Persist;
use crate::error::{CoreError, ValidationError};
use crate::storage::{self, keys, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalState {
    pub entries: Vec<JournalEntry>,
}

impl JournalState {
    pub fn load(kv: &dyn KeyValueStore) -> Self {
        Self {
            entries: storage::load_or(kv, keys::JOURNAL, Vec::new()),
        }
    }

    pub fn add_entry(&mut self, text: &str, now: DateTime<Utc>) -> Result<&JournalEntry, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "text".into(),
                message: "must not be empty".into(),
            });
        }
        self.entries.push(JournalEntry {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at: now,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }
}

impl Persist for JournalState {
    fn persist(&self, _prev: &Self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        storage::save(kv, keys::JOURNAL, &self.entries)
    }
}
