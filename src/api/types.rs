//! Request and response types for the Sheets Manager backend API.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::ApiError;

/// Username and password for one login attempt. Never persisted; the
/// password is wiped from memory when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login request body sent to POST /api/token/.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Access/refresh pair returned by POST /api/token/.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Refresh request body sent to POST /api/token/refresh/.
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh response from POST /api/token/refresh/.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// One spreadsheet row.
///
/// The sheet hands numeric-looking cells back as JSON numbers, so `id`,
/// `name` and `description` accept either form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Assigned by the backend, never changes.
    #[serde(deserialize_with = "row_id")]
    pub id: u64,
    #[serde(deserialize_with = "cell_text")]
    pub name: String,
    #[serde(default, deserialize_with = "cell_text")]
    pub description: String,
    /// Owner column, present on sheets that track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A sheet cell as the backend serializes it.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Number(serde_json::Number),
}

fn cell_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Cell::deserialize(deserializer)? {
        Cell::Text(text) => text,
        Cell::Number(n) => n.to_string(),
    })
}

fn row_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Cell::deserialize(deserializer)? {
        Cell::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("invalid item id {}", n))),
        Cell::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid item id {:?}", text))),
    }
}

/// Body for creating or fully replacing an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemInput {
    pub name: String,
    pub description: String,
}

impl ItemInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Reject a blank name before anything is sent.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::ValidationFailed("Name is required".to_string()));
        }
        Ok(())
    }
}

/// Error body of a failed request: `{error}` from the item views,
/// `{detail}` from the token views.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        self.error.or(self.detail).filter(|m| !m.is_empty())
    }
}
