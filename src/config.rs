//! Runtime configuration.
//!
//! Values come from the command line, then the environment (a `.env` file is
//! loaded first), then the defaults below.

use clap::ValueEnum;

/// Local Django development server.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Keychain service the session entries are filed under.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "com.sheets-manager.cli";

/// Where the session keys are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionBackend {
    /// OS keychain; survives restarts.
    Keychain,
    /// Process memory; gone when the command exits.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend origin without a trailing slash; API paths start with `/api/`.
    pub api_base_url: String,
    pub keychain_service: String,
    pub session_backend: SessionBackend,
}

impl Config {
    pub fn new(api_base_url: &str, keychain_service: &str, session_backend: SessionBackend) -> Self {
        Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            keychain_service: keychain_service.to_string(),
            session_backend,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_KEYCHAIN_SERVICE, SessionBackend::Keychain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.keychain_service, "com.sheets-manager.cli");
        assert_eq!(config.session_backend, SessionBackend::Keychain);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = Config::new(" https://sheets.example.com/ ", "svc", SessionBackend::Memory);
        assert_eq!(config.api_base_url, "https://sheets.example.com");
    }
}
