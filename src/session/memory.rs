//! In-process session storage.
//!
//! Used when no OS keychain is reachable and by tests. Contents are lost when
//! the process exits. Clones share the same entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{SessionError, SessionStorage};

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, SessionError> {
        self.entries
            .lock()
            .map_err(|_| SessionError::Storage("memory storage lock poisoned".to_string()))
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
impl MemoryStorage {
    pub(crate) fn seeded(entries: &[(&str, &str)]) -> Self {
        let storage = Self::new();
        for (key, value) in entries {
            storage.write(key, value).unwrap();
        }
        storage
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.read(key).unwrap()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
