//! Credential storage.
//!
//! API tokens live in the OS keyring, never in the key-value store.
//! [`MemorySecrets`] stands in for the keyring in tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::StorageError;

/// Keyring service name for every nook credential.
pub const SERVICE: &str = "nook";

/// Entry holding the Todoist API token.
pub const TODOIST_TOKEN: &str = "todoist_api_token";

pub trait SecretStore {
    /// `Ok(None)` when no entry exists.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Deleting a missing entry succeeds.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Thin wrapper around the OS keyring.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringSecrets;

impl KeyringSecrets {
    pub fn new() -> Self {
        Self
    }
}

impl SecretStore for KeyringSecrets {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process secrets, for tests.
#[derive(Debug, Default)]
pub struct MemorySecrets {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecrets {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_secrets_delete_is_idempotent() {
        let secrets = MemorySecrets::new();
        assert_eq!(secrets.get(TODOIST_TOKEN).unwrap(), None);
        secrets.set(TODOIST_TOKEN, "tok").unwrap();
        assert_eq!(secrets.get(TODOIST_TOKEN).unwrap().as_deref(), Some("tok"));
        secrets.delete(TODOIST_TOKEN).unwrap();
        secrets.delete(TODOIST_TOKEN).unwrap();
        assert_eq!(secrets.get(TODOIST_TOKEN).unwrap(), None);
    }
}
