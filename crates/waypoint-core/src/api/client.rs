//! API client for the booking backend's REST API.
//!
//! This module provides the `ApiClient` struct, which implements
//! `ResourceApi` for every `Resource` by mapping it onto the conventional
//! collection/item endpoints.

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::DashboardStats;
use crate::store::Resource;

use super::{ApiError, ListParams, ResourceApi};

// ============================================================================
// Constants
// ============================================================================

/// Path of the admin dashboard aggregates.
const DASHBOARD_STATS_PATH: &str = "dashboard/stats";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Capacity of the client event channel.
const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Cross-cutting signals raised by the client, independent of any store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEvent {
    /// The backend rejected the bearer token. Hosts typically log out.
    Unauthorized,
}

/// Payloads arrive either bare or wrapped as `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str::<Envelope<T>>(text).map(Envelope::into_inner)
}

/// API client for the booking backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    events: broadcast::Sender<ApiEvent>,
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. `https://example.com/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            events,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool
    /// and the event channel.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            events: self.events.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Subscribe to client-wide events such as rejected tokens.
    pub fn events(&self) -> broadcast::Receiver<ApiEvent> {
        self.events.subscribe()
    }

    /// Fetch the admin dashboard aggregates.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let url = self.collection_url(DASHBOARD_STATS_PATH);
        self.request_json(Method::GET, &url, &[], None::<&()>).await
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_matches('/'))
    }

    fn item_url(&self, path: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(path), id)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ApiError::Validation("Bearer token contains invalid characters".to_string())
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(Some(response))
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // No subscribers is fine
                let _ = self.events.send(ApiEvent::Unauthorized);
            }
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(self.auth_headers()?)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(method = %method, url = url, "Sending request");
            let response = request.send().await?;

            match self.check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(
                        url = url,
                        retry = retries,
                        backoff_ms = backoff_ms,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        parse_payload(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    async fn request_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response = self.execute(method, url, query, body).await?;
        Self::decode(response, url).await
    }
}

impl<R: Resource> ResourceApi<R> for ApiClient {
    async fn list(&self, params: &ListParams) -> Result<Vec<R>, ApiError> {
        let url = self.collection_url(R::PATH);
        self.request_json(Method::GET, &url, params.as_pairs(), None::<&()>)
            .await
    }

    async fn get(&self, id: &str) -> Result<R, ApiError> {
        let url = self.item_url(R::PATH, id);
        self.request_json(Method::GET, &url, &[], None::<&()>).await
    }

    async fn create(&self, input: &R::Create) -> Result<R, ApiError> {
        let url = self.collection_url(R::PATH);
        self.request_json(Method::POST, &url, &[], Some(input)).await
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R, ApiError> {
        let url = self.item_url(R::PATH, id);
        self.request_json(Method::PUT, &url, &[], Some(patch)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.item_url(R::PATH, id);
        self.execute(Method::DELETE, &url, &[], None::<&()>).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
