//! HTTP client with bearer injection and a single refresh-and-retry.
//!
//! Authenticated calls read the access token from the session store on every
//! send. A 401 triggers at most one refresh through `POST /api/token/refresh/`
//! and at most one retry; the retried response is handed back whatever its
//! status, so a refresh token that keeps yielding 401s cannot loop.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;
use super::types::{RefreshRequest, RefreshResponse};
use crate::session::SessionStore;

/// Token refresh endpoint.
pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// Outcome of one authenticated send.
enum Attempt {
    /// Anything but a 401, returned to the caller untouched.
    Done(Response),
    /// The access token was rejected.
    NeedsRefresh,
}

/// HTTP client for the Sheets Manager API.
///
/// Shares the session store with the rest of the app; it reads credentials
/// from it, writes refreshed access tokens back, and invalidates it when a
/// 401 cannot be recovered.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a new API client with the given base URL.
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Send an authenticated request to a relative API path.
    ///
    /// Non-401 responses are returned as-is; the status is the caller's concern.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        // Encode once so the retry resends the same body
        let body = body.map(serde_json::to_value).transpose()?;

        match self.attempt(&method, path, body.as_ref()).await? {
            Attempt::Done(resp) => Ok(resp),
            Attempt::NeedsRefresh => {
                self.refresh_access_token().await?;
                log::debug!("Retrying {} {} with refreshed token", method, path);
                self.send(&method, path, body.as_ref()).await
            }
        }
    }

    /// Send an authenticated GET request to a relative API path.
    pub async fn get(&self, path: &str) -> Result<Response, ApiError> {
        self.request::<Value>(Method::GET, path, None).await
    }

    /// Send an authenticated POST request with a JSON body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Send an authenticated PUT request with a JSON body.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Send an authenticated DELETE request.
    pub async fn delete(&self, path: &str) -> Result<Response, ApiError> {
        self.request::<Value>(Method::DELETE, path, None).await
    }

    /// Send an unauthenticated POST request with a JSON body.
    /// Used for login and refresh, which must never carry a bearer token.
    pub async fn post_anonymous<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ApiError> {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(network_error)
    }

    async fn attempt(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Attempt, ApiError> {
        let resp = self.send(method, path, body).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            log::debug!("{} {} rejected with 401", method, path);
            return Ok(Attempt::NeedsRefresh);
        }
        Ok(Attempt::Done(resp))
    }

    /// Build and send one request, taking the current access token from the session.
    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let mut builder = self.client.request(method.clone(), self.url(path));

        if let Some(token) = self.session.access_token().await {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(network_error)?;
        log::debug!("{} {} -> {}", method, path, resp.status());
        Ok(resp)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Any answer other than a usable access token invalidates the session.
    /// A transport failure does not, including one while reading the body:
    /// the refresh token was never rejected.
    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let Some(refresh) = self.session.refresh_token().await else {
            log::warn!("Access token rejected and no refresh token is stored");
            self.expire_session("no refresh token").await;
            return Err(ApiError::SessionExpired);
        };

        let resp = self
            .post_anonymous(
                REFRESH_PATH,
                &RefreshRequest {
                    refresh: refresh.clone(),
                },
            )
            .await?;

        if !resp.status().is_success() {
            log::warn!("Token refresh rejected ({})", resp.status());
            self.expire_session("refresh token rejected").await;
            return Err(ApiError::SessionExpired);
        }

        // A body cut off in transit is a network failure, not a bad answer
        let body = resp.bytes().await.map_err(network_error)?;
        let refreshed: RefreshResponse = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Failed to parse refresh response: {}", e);
                self.expire_session("malformed refresh response").await;
                return Err(ApiError::SessionExpired);
            }
        };

        self.session
            .replace_access_token(&refresh, &refreshed.access)
            .await?;
        log::info!("Access token refreshed");
        Ok(())
    }

    async fn expire_session(&self, reason: &str) {
        if let Err(e) = self.session.invalidate(reason).await {
            log::warn!("Failed to clear persisted session: {}", e);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn network_error(err: reqwest::Error) -> ApiError {
    ApiError::NetworkUnavailable(err.to_string())
}
