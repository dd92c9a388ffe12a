//! OS keychain storage for the session keys.
//!
//! Each key is a separate keychain entry under one service name, so the
//! session survives process restarts without ever being written to disk by us.

use keyring::Entry;

use super::{SessionError, SessionStorage, USERNAME_KEY};

impl From<keyring::Error> for SessionError {
    fn from(err: keyring::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct KeychainStorage {
    service: String,
}

impl KeychainStorage {
    /// Create storage for the given service name.
    ///
    /// Probes the platform backend once so a missing keychain is reported
    /// here rather than on the first login.
    pub fn new(service: &str) -> Result<Self, SessionError> {
        let probe = Entry::new(service, USERNAME_KEY)?;
        match probe.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(SessionError::from(e)),
        }
        Ok(Self {
            service: service.to_string(),
        })
    }

    fn entry(&self, key: &str) -> Result<Entry, SessionError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl SessionStorage for KeychainStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SessionError::from(e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // already gone
            Err(e) => Err(SessionError::from(e)),
        }
    }
}
