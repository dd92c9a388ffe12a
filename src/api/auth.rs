//! Username/password login against the JWT token endpoint.
//!
//! `login` only exchanges credentials for tokens. Committing them to the
//! session store is the caller's decision.

use super::client::ApiClient;
use super::error::ApiError;
use super::failure_message;
use super::types::{Credentials, LoginRequest, TokenPair};

/// Token obtain endpoint.
pub const TOKEN_PATH: &str = "/api/token/";

/// Exchange credentials for an access/refresh pair.
///
/// POST /api/token/ without a bearer token. Any non-success answer is
/// reported as `InvalidCredentials` carrying the server's `detail`.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<TokenPair, ApiError> {
    let req = LoginRequest {
        username: &credentials.username,
        password: &credentials.password,
    };

    let resp = client.post_anonymous(TOKEN_PATH, &req).await?;

    if !resp.status().is_success() {
        let message = failure_message(resp, "Login failed").await;
        log::info!("Login rejected for {}", credentials.username);
        return Err(ApiError::InvalidCredentials(message));
    }

    resp.json::<TokenPair>()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::session::{MemoryStorage, SessionStore};

    fn client_for(server: &Server) -> ApiClient {
        let session = SessionStore::open(Box::new(MemoryStorage::new())).unwrap();
        ApiClient::new(&server.url(), Arc::new(session))
    }

    #[tokio::test]
    async fn test_login_returns_tokens() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"username": "alice", "password": "secret"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access": "acc-1", "refresh": "ref-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let tokens = login(&client, &Credentials::new("alice", "secret"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access, "acc-1");
        assert_eq!(tokens.refresh, "ref-1");
        // Committing the tokens is left to the caller
        assert!(!client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_rejected_carries_detail() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "No active account found with the given credentials"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = login(&client, &Credentials::new("alice", "wrong")).await;

        mock.assert_async().await;
        match result {
            Err(ApiError::InvalidCredentials(msg)) => {
                assert_eq!(msg, "No active account found with the given credentials")
            }
            other => panic!("expected InvalidCredentials, got {:?}", other),
        }
        assert!(!client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_rejected_without_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(400)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = login(&client, &Credentials::new("alice", "")).await;

        match result {
            Err(ApiError::InvalidCredentials(msg)) => assert!(msg.starts_with("Login failed")),
            other => panic!("expected InvalidCredentials, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_unreachable_backend() {
        let session = SessionStore::open(Box::new(MemoryStorage::new())).unwrap();
        let client = ApiClient::new("http://127.0.0.1:1", Arc::new(session));

        let result = login(&client, &Credentials::new("alice", "secret")).await;

        assert!(matches!(result, Err(ApiError::NetworkUnavailable(_))));
    }
}
