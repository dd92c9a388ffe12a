//! Session store for the logged-in user.
//!
//! Holds the access token, refresh token and username on top of a pluggable
//! durable key-value storage. Every read and write of the persisted keys goes
//! through `SessionStore`; the three keys are written together and cleared
//! together, never individually.

pub mod claims;
pub mod keychain;
pub mod memory;

pub use keychain::KeychainStorage;
pub use memory::MemoryStorage;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Storage key for the short-lived access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the username the tokens were issued to.
pub const USERNAME_KEY: &str = "username";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USERNAME_KEY];

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage failed: {0}")]
    Storage(String),
}

/// Durable key-value storage behind the session store.
///
/// Implementations must treat removal of a missing key as success.
pub trait SessionStorage: Send + Sync {
    /// Read a value, `None` if the key was never written or has been removed.
    fn read(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Write a value, replacing any previous one.
    fn write(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Remove a value.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Snapshot of the persisted credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub username: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// Authenticated iff both the access token and the username are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.username.is_some()
    }
}

/// Session transitions published to subscribers (the UI layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login committed new credentials.
    LoggedIn { username: String },
    /// The user logged out.
    LoggedOut,
    /// The session was forcibly cleared because it could not be refreshed.
    /// Subscribers should present the login flow again.
    Invalidated { reason: String },
}

/// Current session, cached in memory and mirrored to durable storage.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Open the store, loading whatever a previous run persisted.
    ///
    /// A record that is not a complete authenticated session (for example an
    /// access token without a username) is discarded and its keys removed.
    pub fn open(storage: Box<dyn SessionStorage>) -> Result<Self, SessionError> {
        let loaded = Session {
            username: storage.read(USERNAME_KEY)?,
            access_token: storage.read(ACCESS_TOKEN_KEY)?,
            refresh_token: storage.read(REFRESH_TOKEN_KEY)?,
        };

        let session = if loaded.is_authenticated() || loaded == Session::default() {
            loaded
        } else {
            log::warn!("Discarding incomplete persisted session");
            remove_all(storage.as_ref())?;
            Session::default()
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            storage,
            current: RwLock::new(session),
            events,
        })
    }

    /// Persist a freshly issued session.
    ///
    /// On a storage failure part-way through, every key is removed again and
    /// the store is left anonymous, so a half-written record never survives.
    pub async fn set_session(
        &self,
        username: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), SessionError> {
        let mut current = self.current.write().await;

        let writes = [
            (USERNAME_KEY, username),
            (ACCESS_TOKEN_KEY, access_token),
            (REFRESH_TOKEN_KEY, refresh_token),
        ];
        for (key, value) in writes {
            if let Err(e) = self.storage.write(key, value) {
                *current = Session::default();
                if let Err(cleanup) = remove_all(self.storage.as_ref()) {
                    log::warn!("Failed to roll back partial session write: {}", cleanup);
                }
                return Err(e);
            }
        }

        *current = Session {
            username: Some(username.to_string()),
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
        };
        drop(current);

        // No subscribers is fine
        let _ = self.events.send(SessionEvent::LoggedIn {
            username: username.to_string(),
        });
        Ok(())
    }

    /// Store a new access token obtained by exchanging `refresh_token`.
    ///
    /// Ignored unless that refresh token is still the current one, so a
    /// refresh that finishes after a logout (or a login as someone else)
    /// cannot leak into the new session.
    pub async fn replace_access_token(
        &self,
        refresh_token: &str,
        access_token: &str,
    ) -> Result<(), SessionError> {
        let mut current = self.current.write().await;
        if current.refresh_token.as_deref() != Some(refresh_token) {
            log::debug!("Session changed during refresh, dropping new access token");
            return Ok(());
        }
        self.storage.write(ACCESS_TOKEN_KEY, access_token)?;
        current.access_token = Some(access_token.to_string());
        Ok(())
    }

    /// Log out: remove all three keys.
    pub async fn clear_session(&self) -> Result<(), SessionError> {
        self.reset(SessionEvent::LoggedOut).await
    }

    /// Forced clear after an irrecoverable authorization failure.
    pub async fn invalidate(&self, reason: &str) -> Result<(), SessionError> {
        self.reset(SessionEvent::Invalidated {
            reason: reason.to_string(),
        })
        .await
    }

    /// The in-memory session is always reset, even if the storage refuses
    /// the removal; the storage error is still reported.
    async fn reset(&self, event: SessionEvent) -> Result<(), SessionError> {
        let mut current = self.current.write().await;
        *current = Session::default();
        let removed = remove_all(self.storage.as_ref());
        drop(current);

        let _ = self.events.send(event);
        removed
    }

    pub async fn access_token(&self) -> Option<String> {
        self.current.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.current.read().await.refresh_token.clone()
    }

    pub async fn username(&self) -> Option<String> {
        self.current.read().await.username.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_authenticated()
    }

    /// Receive session transitions from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Remove every session key, attempting all of them and reporting the first failure.
fn remove_all(storage: &dyn SessionStorage) -> Result<(), SessionError> {
    let mut first_error = None;
    for key in SESSION_KEYS {
        if let Err(e) = storage.remove(key) {
            log::warn!("Failed to remove session key {}: {}", key, e);
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(storage: &MemoryStorage) -> SessionStore {
        SessionStore::open(Box::new(storage.clone())).unwrap()
    }

    /// Storage that refuses to write one particular key.
    struct RefusingStorage {
        inner: MemoryStorage,
        refused_key: &'static str,
    }

    impl SessionStorage for RefusingStorage {
        fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
            if key == self.refused_key {
                return Err(SessionError::Storage("disk full".into()));
            }
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), SessionError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn test_starts_anonymous() {
        let storage = MemoryStorage::new();
        let store = open(&storage);

        assert!(!store.is_authenticated().await);
        assert!(store.username().await.is_none());
        assert!(store.access_token().await.is_none());
        assert!(store.refresh_token().await.is_none());
    }

    #[tokio::test]
    async fn test_set_session_persists_all_keys() {
        let storage = MemoryStorage::new();
        let store = open(&storage);

        store.set_session("alice", "acc-1", "ref-1").await.unwrap();

        assert!(store.is_authenticated().await);
        assert_eq!(store.username().await.as_deref(), Some("alice"));
        assert_eq!(store.access_token().await.as_deref(), Some("acc-1"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("ref-1"));
        assert_eq!(storage.get(USERNAME_KEY).as_deref(), Some("alice"));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("acc-1"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref-1"));
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let storage = MemoryStorage::new();
        open(&storage)
            .set_session("alice", "acc-1", "ref-1")
            .await
            .unwrap();

        let reopened = open(&storage);
        assert!(reopened.is_authenticated().await);
        assert_eq!(reopened.username().await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_clear_removes_all_keys() {
        let storage = MemoryStorage::new();
        let store = open(&storage);
        store.set_session("alice", "acc-1", "ref-1").await.unwrap();

        store.clear_session().await.unwrap();

        assert!(!store.is_authenticated().await);
        assert!(store.access_token().await.is_none());
        assert!(store.refresh_token().await.is_none());
        assert!(store.username().await.is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_record_discarded_on_open() {
        let storage = MemoryStorage::seeded(&[(ACCESS_TOKEN_KEY, "acc-1"), (REFRESH_TOKEN_KEY, "ref-1")]);

        let store = open(&storage);

        assert!(!store.is_authenticated().await);
        assert!(store.refresh_token().await.is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_record() {
        let inner = MemoryStorage::new();
        let store = SessionStore::open(Box::new(RefusingStorage {
            inner: inner.clone(),
            refused_key: REFRESH_TOKEN_KEY,
        }))
        .unwrap();

        let result = store.set_session("alice", "acc-1", "ref-1").await;

        assert!(matches!(result, Err(SessionError::Storage(_))));
        assert!(!store.is_authenticated().await);
        assert!(inner.is_empty());
    }

    #[tokio::test]
    async fn test_replace_access_token_keeps_other_fields() {
        let storage = MemoryStorage::new();
        let store = open(&storage);
        store.set_session("alice", "acc-1", "ref-1").await.unwrap();

        store.replace_access_token("ref-1", "acc-2").await.unwrap();

        assert_eq!(store.access_token().await.as_deref(), Some("acc-2"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("ref-1"));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("acc-2"));
    }

    #[tokio::test]
    async fn test_replace_access_token_after_logout_is_dropped() {
        let storage = MemoryStorage::new();
        let store = open(&storage);
        store.set_session("alice", "acc-1", "ref-1").await.unwrap();
        store.clear_session().await.unwrap();

        store.replace_access_token("ref-1", "acc-2").await.unwrap();

        assert!(store.access_token().await.is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_stale_refresh_does_not_leak_into_next_login() {
        let storage = MemoryStorage::new();
        let store = open(&storage);
        store.set_session("alice", "alice-acc", "alice-ref").await.unwrap();
        store.clear_session().await.unwrap();
        store.set_session("bob", "bob-acc", "bob-ref").await.unwrap();

        // alice's refresh lands after bob logged in
        store
            .replace_access_token("alice-ref", "alice-new-acc")
            .await
            .unwrap();

        assert_eq!(store.username().await.as_deref(), Some("bob"));
        assert_eq!(store.access_token().await.as_deref(), Some("bob-acc"));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("bob-acc"));
    }

    #[tokio::test]
    async fn test_events_published() {
        let store = open(&MemoryStorage::new());
        let mut events = store.subscribe();

        store.set_session("alice", "acc-1", "ref-1").await.unwrap();
        store.invalidate("refresh token rejected").await.unwrap();
        store.clear_session().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedIn {
                username: "alice".into()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Invalidated {
                reason: "refresh token rejected".into()
            }
        );
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
