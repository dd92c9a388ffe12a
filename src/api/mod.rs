//! API client module for the Sheets Manager backend.
//!
//! Provides the HTTP client with bearer injection and refresh-and-retry,
//! the login call, typed item operations, and the request/response types.

pub mod auth;
pub mod client;
pub mod error;
pub mod items;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;

use reqwest::Response;

use types::ErrorBody;

/// Human-readable reason for a failed response: the server's `error`/`detail`
/// when the body carries one, otherwise `fallback` with the status code.
pub(crate) async fn failure_message(resp: Response, fallback: &str) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::message)
        .unwrap_or_else(|| format!("{} ({})", fallback, status))
}
