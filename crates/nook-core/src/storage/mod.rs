//! Key-value persistence.
//!
//! Every state slice is stored as a whole under its own namespaced key;
//! there are no partial-field writes at this layer.

mod config;
pub mod database;
pub mod migrations;
pub mod secrets;

pub use config::{Config, LogConfig, SyncConfig, TimerConfig};
pub(crate) use config::{get_json_value_by_path, set_json_value_by_path};
pub use database::SqliteStore;
pub use secrets::{KeyringSecrets, MemorySecrets, SecretStore};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, StorageError};

/// Namespaced keys, one per state slice.
pub mod keys {
    pub const SETTINGS: &str = "nook_settings";
    pub const STATS: &str = "nook_stats";
    pub const SEEDS: &str = "nook_seeds";
    pub const POSTCARDS: &str = "nook_postcards";
    pub const TASKS: &str = "nook_tasks";
    pub const ARCHIVED_TASKS: &str = "nook_archived_tasks";
    /// Where the API token lived before it moved to the keyring.
    pub const LEGACY_TODOIST_TOKEN: &str = "nook_todoist_token";
    pub const FOCUSED_TASK: &str = "nook_focused_task";
    pub const JOURNAL: &str = "nook_journal";
    pub const MEDIA: &str = "nook_media";
    pub const TIMER: &str = "nook_timer";
}

/// String-keyed store with string values.
///
/// Methods take `&self`; implementations use interior mutability so a
/// single store can be shared by every state container.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// In-process store, used by tests and as a scratch store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

/// Read `key` as `T`, falling back to `default` when the key is absent or
/// the stored value does not parse.
///
/// A raw (non-JSON) value is accepted when `T` deserializes from a string.
pub fn load_or<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    let raw = match store.get(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return default,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read key, using default");
            return default;
        }
    };

    if let Ok(value) = serde_json::from_str::<T>(&raw) {
        return value;
    }
    match serde_json::from_value::<T>(serde_json::Value::String(raw)) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored value did not parse, using default");
            default
        }
    }
}

/// Write `value` under `key`. Strings are stored raw, everything else as JSON.
pub fn save<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), CoreError> {
    let raw = match serde_json::to_value(value)? {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    store.set(key, &raw)?;
    Ok(())
}

/// Returns `~/.config/nook[-dev]/` based on NOOK_ENV.
///
/// Set NOOK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("NOOK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("nook-dev")
    } else {
        base_dir.join("nook")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}
