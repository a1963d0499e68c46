//! Mock transport for testing
//!
//! Answers requests from canned responses without touching the network and
//! records every request it sees.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::mobdb::MobdbClient;
use super::request::RetryPolicy;
use super::token::TokenManager;
use super::transport::{OutboundRequest, RawResponse, Transport};
use crate::error::ApiError;

/// Base URL every mock client is built with
pub const MOCK_BASE_URL: &str = "https://mock.mobdb.test/v1";

/// Environment variable guaranteed to be unset in tests
pub const UNSET_ENV_VAR: &str = "MOBDB_TEST_REFRESH_TOKEN_UNSET";

/// Mock transport for testing.
///
/// Routes are keyed by method and path (`"GET /feeds"`). A route given
/// several responses plays them in order and then repeats the last one.
/// Credential exchanges (`POST /tokens`) answer `access-N` unless a
/// token response is configured.
///
/// # Example
/// ```ignore
/// let transport = Arc::new(
///     MockTransport::new()
///         .with_json("/feeds", json!([{"id": "mdb-1"}]))
///         .await,
/// );
/// let client = mock_client(transport.clone());
/// ```
#[derive(Default)]
pub struct MockTransport {
    /// Canned responses per route
    routes: Arc<Mutex<HashMap<String, VecDeque<RawResponse>>>>,
    /// Response to credential exchanges, if not the default
    token_response: Arc<Mutex<Option<RawResponse>>>,
    /// Transport error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
    /// Captured requests for test assertions
    captured_requests: Arc<Mutex<Vec<OutboundRequest>>>,
    /// Delay before every response
    latency: Duration,
}

/// Tracks transport call counts for test verification
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct CallCounts {
    pub token_exchange: usize,
    pub catalog: usize,
}

impl CallCounts {
    /// Get total number of requests sent.
    pub fn total(&self) -> usize {
        self.token_exchange + self.catalog
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `GET {path}` with 200 and a JSON body
    pub async fn with_json(self, path: &str, body: Value) -> Self {
        self.with_response("GET", path, RawResponse::json(200, &body))
            .await
    }

    /// Queue a response for a route
    pub async fn with_response(self, method: &str, path: &str, response: RawResponse) -> Self {
        self.routes
            .lock()
            .await
            .entry(format!("{} {}", method, path))
            .or_default()
            .push_back(response);
        self
    }

    /// Answer credential exchanges with a fixed response
    pub async fn with_token_response(self, response: RawResponse) -> Self {
        *self.token_response.lock().await = Some(response);
        self
    }

    /// Hold every response back by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next request with a transport error
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    pub async fn captured_requests(&self) -> Vec<OutboundRequest> {
        self.captured_requests.lock().await.clone()
    }

    /// Catalog requests only, in the order sent
    pub async fn catalog_requests(&self) -> Vec<OutboundRequest> {
        self.captured_requests
            .lock()
            .await
            .iter()
            .filter(|r| r.method == reqwest::Method::GET)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError> {
        self.captured_requests.lock().await.push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let path = request.path_under(MOCK_BASE_URL).to_string();
        let is_exchange = request.method == reqwest::Method::POST && path == "/tokens";

        let exchanges = {
            let mut counts = self.call_count.lock().await;
            if is_exchange {
                counts.token_exchange += 1;
            } else {
                counts.catalog += 1;
            }
            counts.token_exchange
        };

        if let Some(error) = self.error.lock().await.take() {
            return Err(error);
        }

        if is_exchange {
            if let Some(response) = self.token_response.lock().await.clone() {
                return Ok(response);
            }
            return Ok(RawResponse::json(
                200,
                &json!({"access_token": format!("access-{}", exchanges)}),
            ));
        }

        let key = format!("{} {}", request.method, path);
        let mut routes = self.routes.lock().await;
        let response = match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(response.unwrap_or_else(|| {
            RawResponse::json(404, &json!({"detail": format!("No mock route for {}", key)}))
        }))
    }
}

/// A live client over `transport` with refresh credential `refresh-1` and
/// millisecond retry backoff.
pub fn mock_client(transport: Arc<MockTransport>) -> MobdbClient {
    MobdbClient::with_transport(transport, MOCK_BASE_URL)
        .with_token_manager(
            TokenManager::new(Some("refresh-1".to_string())).with_env_var(UNSET_ENV_VAR),
        )
        .with_retry(RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            ..RetryPolicy::default()
        })
}
