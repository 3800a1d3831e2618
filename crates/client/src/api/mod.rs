//! REST client for the parish backend.
//!
//! Provides JSON requests against the configured API root with bearer
//! authentication taken from storage.
//!
//! # Authentication
//!
//! A `401` triggers one shared refresh-token exchange (`POST /auth/refresh`,
//! refresh token carried in the cookie jar). Requests that fail with `401`
//! while a refresh is running wait for it and replay with the new token.
//! If the exchange fails, every auth key is cleared and all waiters get
//! [`ClientError::SessionExpired`]. A request is retried at most once.

pub mod response;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::storage::{Storage, keys};

pub use response::{decode_body, looks_like_html};

/// Endpoints that must never trigger a refresh themselves.
const UNREFRESHABLE: [&str; 3] = ["auth/login", "auth/register", "auth/refresh"];

/// Body of a successful token refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(alias = "token")]
    access_token: String,
}

/// Client for the parish REST API.
///
/// Cheaply cloneable; clones share the HTTP connection pool, cookie jar,
/// storage and refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_url_configured: bool,
    storage: Arc<dyn Storage>,
    /// Held while a refresh exchange is in flight.
    refresh_gate: Mutex<()>,
    /// Bumped whenever the stored access token changes or is cleared.
    auth_generation: AtomicU64,
}

impl ApiClient {
    /// Create a client for the configured API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                api_url_configured: config.api_url_configured,
                storage,
                refresh_gate: Mutex::new(()),
                auth_generation: AtomicU64::new(0),
            }),
        })
    }

    /// The storage this client reads tokens from.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    /// The API root endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Session tokens
    // =========================================================================

    /// The stored access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        let storage = &self.inner.storage;
        storage
            .get(keys::ACCESS_TOKEN)
            .or_else(|| storage.get(keys::TOKEN))
            .filter(|token| !token.is_empty())
    }

    /// Store a new access token under both token keys.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn store_access_token(&self, token: &str) -> Result<()> {
        self.inner.storage.set(keys::ACCESS_TOKEN, token)?;
        self.inner.storage.set(keys::TOKEN, token)?;
        self.inner.auth_generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Remove every auth key from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn clear_auth(&self) -> Result<()> {
        self.inner.auth_generation.fetch_add(1, Ordering::AcqRel);
        self.inner.storage.remove_all(&keys::AUTH)?;
        Ok(())
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(path, body)?;
        self.request(Method::POST, path, Some(body)).await
    }

    /// `PUT` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(path, body)?;
        self.request(Method::PUT, path, Some(body)).await
    }

    /// `DELETE` a resource.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None).await
    }

    /// Resolve an endpoint path against the API root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let relative = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(relative)
            .map_err(|e| ClientError::InvalidEndpoint(path.to_owned(), e))
    }

    #[instrument(skip_all, fields(method = %method, path = %path))]
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let endpoint = path.trim_start_matches('/');

        let generation = self.inner.auth_generation.load(Ordering::Acquire);
        let (status, text) = self
            .send(method.clone(), &url, body.as_ref(), self.access_token())
            .await?;

        if status == StatusCode::UNAUTHORIZED
            && !UNREFRESHABLE.iter().any(|p| endpoint.starts_with(p))
        {
            debug!("Unauthorized, refreshing session before retrying once");
            self.refresh_after_unauthorized(generation).await?;
            let (status, text) = self
                .send(method, &url, body.as_ref(), self.access_token())
                .await?;
            return decode_body(status, &text, endpoint, self.inner.api_url_configured);
        }

        decode_body(status, &text, endpoint, self.inner.api_url_configured)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: Option<String>,
    ) -> Result<(StatusCode, String)> {
        let mut request = self
            .inner
            .client
            .request(method, url.clone())
            .header("Accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    // =========================================================================
    // Token refresh
    // =========================================================================

    /// Make sure a fresh token exists after a request sent at `seen_generation`
    /// came back `401`.
    ///
    /// Only the first waiter performs the exchange; later waiters observe the
    /// bumped generation and reuse its outcome.
    async fn refresh_after_unauthorized(&self, seen_generation: u64) -> Result<()> {
        let _gate = self.inner.refresh_gate.lock().await;

        if self.inner.auth_generation.load(Ordering::Acquire) != seen_generation {
            return if self.access_token().is_some() {
                debug!("Session already refreshed by a concurrent request");
                Ok(())
            } else {
                Err(ClientError::SessionExpired)
            };
        }

        match self.exchange_refresh_token().await {
            Ok(token) => {
                self.store_access_token(&token)?;
                debug!("Session refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, clearing auth state");
                self.clear_auth()?;
                Err(ClientError::SessionExpired)
            }
        }
    }

    #[instrument(skip(self))]
    async fn exchange_refresh_token(&self) -> Result<String> {
        let url = self.endpoint("auth/refresh")?;
        let (status, text) = self
            .send(Method::POST, &url, Some(&serde_json::json!({})), None)
            .await?;
        let refreshed: RefreshResponse =
            decode_body(status, &text, "auth/refresh", self.inner.api_url_configured)?;
        Ok(refreshed.access_token)
    }
}

fn encode<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(|source| ClientError::Decode {
        endpoint: path.trim_start_matches('/').to_owned(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn client() -> ApiClient {
        let config =
            ClientConfig::for_api_url(Url::parse("http://127.0.0.1:9/parish/api").unwrap());
        ApiClient::new(&config, Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_endpoint_joins_under_api_root() {
        let client = client();
        assert_eq!(
            client.endpoint("/donations/mtn/check-status").unwrap().as_str(),
            "http://127.0.0.1:9/parish/api/donations/mtn/check-status"
        );
        assert_eq!(
            client.endpoint("liturgical-color").unwrap().as_str(),
            "http://127.0.0.1:9/parish/api/liturgical-color"
        );
    }

    #[test]
    fn test_token_storage_and_generation() {
        let client = client();
        assert_eq!(client.access_token(), None);

        client.store_access_token("t1").unwrap();
        assert_eq!(client.access_token().as_deref(), Some("t1"));
        assert_eq!(client.storage().get(keys::TOKEN).as_deref(), Some("t1"));
        assert_eq!(client.inner.auth_generation.load(Ordering::Acquire), 1);

        client.clear_auth().unwrap();
        assert_eq!(client.access_token(), None);
        assert_eq!(client.inner.auth_generation.load(Ordering::Acquire), 2);
    }

    #[test]
    fn test_legacy_token_key_is_read() {
        let client = client();
        client.storage().set(keys::TOKEN, "legacy").unwrap();
        assert_eq!(client.access_token().as_deref(), Some("legacy"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let err = client().get::<serde_json::Value>("events").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.info().status, None);
    }
}
