//! Errors surfaced by the API client and the item operations.
//!
//! Every variant renders a message fit to show the user as-is.

use thiserror::Error;

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (DNS, refused connection, transport timeout).
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The token endpoint rejected the username/password.
    #[error("{0}")]
    InvalidCredentials(String),

    /// A 401 could not be recovered by refreshing. The session has been cleared.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// The item was rejected, either locally or by a 4xx from the backend.
    #[error("{0}")]
    ValidationFailed(String),

    #[error("Item {0} not found")]
    NotFound(u64),

    #[error("{0}")]
    DeleteFailed(String),

    #[error("{0}")]
    FetchFailed(String),

    /// 5xx on a write.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// A success status whose body could not be decoded.
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}
