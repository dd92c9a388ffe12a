//! Application state for the Sheets Manager client.
//!
//! Holds the API client, the shared session store, and the local item list.
//! The list only changes once the backend has confirmed an operation, and is
//! emptied whenever the session ends.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::client::ApiClient;
use crate::api::types::Item;
use crate::session::{SessionEvent, SessionStore};

pub struct AppState {
    /// HTTP client for the Sheets Manager API.
    pub api: Arc<ApiClient>,

    /// Persisted credentials, shared with `api`.
    pub session: Arc<SessionStore>,

    /// Items as last confirmed by the backend, in backend order.
    items: RwLock<Vec<Item>>,
}

impl AppState {
    /// Create a new AppState with the given API base URL and session store.
    pub fn new(api_base_url: &str, session: Arc<SessionStore>) -> Self {
        let api = Arc::new(ApiClient::new(api_base_url, session));
        Self {
            session: Arc::clone(api.session()),
            api,
            items: RwLock::new(Vec::new()),
        }
    }

    pub async fn items(&self) -> Vec<Item> {
        self.items.read().await.clone()
    }

    /// Replace the whole list with a fresh fetch.
    pub async fn replace_items(&self, items: Vec<Item>) {
        *self.items.write().await = items;
    }

    /// Append an item the backend just created.
    pub async fn apply_created(&self, item: Item) {
        self.items.write().await.push(item);
    }

    /// Swap in the backend's copy of an updated item. Unknown ids are ignored.
    pub async fn apply_updated(&self, item: Item) {
        let mut items = self.items.write().await;
        if let Some(existing) = items.iter_mut().find(|i| i.id == item.id) {
            *existing = item;
        }
    }

    /// Drop an item the backend confirmed as deleted.
    pub async fn apply_deleted(&self, id: u64) {
        self.items.write().await.retain(|i| i.id != id);
    }

    pub async fn clear_items(&self) {
        self.items.write().await.clear();
    }

    /// React to a session transition.
    pub async fn handle_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::LoggedIn { username } => {
                log::info!("Session started for {}", username);
            }
            SessionEvent::LoggedOut => {
                self.clear_items().await;
            }
            SessionEvent::Invalidated { reason } => {
                log::warn!("Session invalidated ({}), login required", reason);
                self.clear_items().await;
            }
        }
    }

    /// Spawn a task that applies session events to this state.
    /// The task holds a reference to the state; abort the handle to stop it.
    pub fn watch_session(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let mut events = self.session.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => state.handle_session_event(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Session watcher skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;

    fn item(id: u64, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
            description: String::new(),
            email: None,
        }
    }

    fn state() -> AppState {
        let session = SessionStore::open(Box::new(MemoryStorage::new())).unwrap();
        AppState::new("http://127.0.0.1:8000", Arc::new(session))
    }

    #[tokio::test]
    async fn test_apply_operations() {
        let state = state();
        state
            .replace_items(vec![item(1, "Desk"), item(2, "Lamp")])
            .await;

        state.apply_created(item(3, "Chair")).await;
        state.apply_updated(item(1, "Standing desk")).await;
        state.apply_deleted(2).await;

        let names: Vec<String> = state.items().await.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Standing desk", "Chair"]);
    }

    #[tokio::test]
    async fn test_update_of_unknown_item_ignored() {
        let state = state();
        state.replace_items(vec![item(1, "Desk")]).await;

        state.apply_updated(item(9, "Ghost")).await;

        assert_eq!(state.items().await, vec![item(1, "Desk")]);
    }

    #[tokio::test]
    async fn test_session_end_clears_items() {
        let state = state();

        state.replace_items(vec![item(1, "Desk")]).await;
        state
            .handle_session_event(&SessionEvent::LoggedIn {
                username: "alice".into(),
            })
            .await;
        assert_eq!(state.items().await.len(), 1);

        state
            .handle_session_event(&SessionEvent::Invalidated {
                reason: "refresh token rejected".into(),
            })
            .await;
        assert!(state.items().await.is_empty());

        state.replace_items(vec![item(1, "Desk")]).await;
        state.handle_session_event(&SessionEvent::LoggedOut).await;
        assert!(state.items().await.is_empty());
    }
}
