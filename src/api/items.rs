//! Typed CRUD operations on sheet items.
//!
//! Thin wrappers over `ApiClient` that map HTTP outcomes to `ApiError`.
//! Authorization recovery happens below, in the client.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::client::ApiClient;
use super::error::ApiError;
use super::failure_message;
use super::types::{Item, ItemInput};

/// Collection endpoint for sheet items.
pub const ITEMS_PATH: &str = "/api/sheet-items/";

fn item_path(id: u64) -> String {
    format!("{}{}/", ITEMS_PATH, id)
}

/// GET /api/sheet-items/ -- items in the order the backend returns them.
pub async fn list_items(client: &ApiClient) -> Result<Vec<Item>, ApiError> {
    let resp = client.get(ITEMS_PATH).await?;

    if !resp.status().is_success() {
        return Err(ApiError::FetchFailed(
            failure_message(resp, "Failed to fetch items").await,
        ));
    }

    decode(resp, "item list").await
}

/// GET /api/sheet-items/{id}/
pub async fn get_item(client: &ApiClient, id: u64) -> Result<Item, ApiError> {
    let resp = client.get(&item_path(id)).await?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(id));
    }
    if !resp.status().is_success() {
        return Err(ApiError::FetchFailed(
            failure_message(resp, "Failed to fetch item").await,
        ));
    }

    decode(resp, "item").await
}

/// POST /api/sheet-items/ -- returns the created item with its assigned id.
pub async fn create_item(client: &ApiClient, input: &ItemInput) -> Result<Item, ApiError> {
    input.validate()?;

    let resp = client.post(ITEMS_PATH, input).await?;
    written_item(resp, "Failed to create item").await
}

/// PUT /api/sheet-items/{id}/ -- replaces name and description.
pub async fn update_item(client: &ApiClient, id: u64, input: &ItemInput) -> Result<Item, ApiError> {
    input.validate()?;

    let resp = client.put(&item_path(id), input).await?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(id));
    }
    written_item(resp, "Failed to update item").await
}

/// DELETE /api/sheet-items/{id}/ -- any 2xx counts as deleted.
pub async fn delete_item(client: &ApiClient, id: u64) -> Result<(), ApiError> {
    let resp = client.delete(&item_path(id)).await?;

    if !resp.status().is_success() {
        return Err(ApiError::DeleteFailed(
            failure_message(resp, "Failed to delete item").await,
        ));
    }

    log::debug!("Deleted item {}", id);
    Ok(())
}

/// Map the answer to a create/update: 4xx is a rejected item, 5xx a server fault.
async fn written_item(resp: Response, fallback: &str) -> Result<Item, ApiError> {
    let status = resp.status();

    if status.is_client_error() {
        return Err(ApiError::ValidationFailed(failure_message(resp, fallback).await));
    }
    if !status.is_success() {
        return Err(ApiError::ServerError {
            status: status.as_u16(),
            message: failure_message(resp, fallback).await,
        });
    }

    decode(resp, "item").await
}

async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, ApiError> {
    resp.json()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
}
