//! Read-only inspection of access-token claims.
//!
//! The payload is decoded without verifying the signature -- the backend
//! verifies tokens, we only read `exp` to report how long the session lasts.

use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Invalid JWT format")]
    Malformed,
    #[error("Failed to decode JWT payload: {0}")]
    Decode(String),
    #[error("Failed to parse JWT payload: {0}")]
    Parse(String),
}

/// The subset of SimpleJWT access-token claims the client looks at.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub exp: Option<u64>,
}

impl AccessClaims {
    /// Seconds left before `exp`, negative once expired. `None` without an `exp` claim.
    pub fn seconds_until_expiry(&self, now_secs: u64) -> Option<i64> {
        self.exp.map(|exp| exp as i64 - now_secs as i64)
    }
}

/// Decode the payload segment of a JWT.
pub fn decode_claims(token: &str) -> Result<AccessClaims, ClaimsError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ClaimsError::Malformed);
    }

    // base64url, padding optional
    let payload = parts[1].trim_end_matches('=');
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| ClaimsError::Decode(e.to_string()))?;

    serde_json::from_slice(&decoded).map_err(|e| ClaimsError::Parse(e.to_string()))
}
