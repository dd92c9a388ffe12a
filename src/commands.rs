//! User-facing operations for the CLI.
//!
//! Each command runs one API call and, once the backend has confirmed it,
//! applies the result to `AppState`. A failed call leaves the local state
//! as it was.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::types::{Credentials, Item, ItemInput};
use crate::api::{auth, items, ApiError};
use crate::session::claims;
use crate::state::AppState;

/// What `status` reports about the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub username: Option<String>,
    pub authenticated: bool,
    /// Seconds left on the access token, when its `exp` claim is readable.
    pub expires_in: Option<i64>,
}

/// Log in and commit the issued tokens to the session store.
pub async fn login(state: &AppState, credentials: &Credentials) -> Result<(), ApiError> {
    log::info!("Logging in as {}", credentials.username);

    let tokens = auth::login(&state.api, credentials).await?;
    state
        .session
        .set_session(&credentials.username, &tokens.access, &tokens.refresh)
        .await?;

    log::info!("Login complete for {}", credentials.username);
    Ok(())
}

/// Logout: clear the persisted session and the local item list.
pub async fn logout(state: &AppState) -> Result<(), ApiError> {
    log::info!("Logging out");

    state.session.clear_session().await?;
    state.clear_items().await;

    log::info!("Logout complete");
    Ok(())
}

pub async fn status(state: &AppState) -> SessionStatus {
    let expires_in = match state.session.access_token().await {
        Some(token) => match claims::decode_claims(&token) {
            Ok(c) => c.seconds_until_expiry(now_secs()),
            Err(e) => {
                log::debug!("Access token claims unreadable: {}", e);
                None
            }
        },
        None => None,
    };

    SessionStatus {
        username: state.session.username().await,
        authenticated: state.session.is_authenticated().await,
        expires_in,
    }
}

/// Fetch all items and make them the local list.
pub async fn load_items(state: &AppState) -> Result<Vec<Item>, ApiError> {
    let fetched = items::list_items(&state.api).await?;
    state.replace_items(fetched.clone()).await;
    Ok(fetched)
}

pub async fn show_item(state: &AppState, id: u64) -> Result<Item, ApiError> {
    items::get_item(&state.api, id).await
}

pub async fn create_item(state: &AppState, input: &ItemInput) -> Result<Item, ApiError> {
    let item = items::create_item(&state.api, input).await?;
    log::info!("Created item {}", item.id);
    state.apply_created(item.clone()).await;
    Ok(item)
}

pub async fn update_item(state: &AppState, id: u64, input: &ItemInput) -> Result<Item, ApiError> {
    let item = items::update_item(&state.api, id, input).await?;
    log::info!("Updated item {}", item.id);
    state.apply_updated(item.clone()).await;
    Ok(item)
}

pub async fn delete_item(state: &AppState, id: u64) -> Result<(), ApiError> {
    items::delete_item(&state.api, id).await?;
    log::info!("Deleted item {}", id);
    state.apply_deleted(id).await;
    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
