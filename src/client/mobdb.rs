//! Mobility Database API client implementation

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::api::{AuthApi, CatalogApi};
use super::models::{AccessToken, TokenResponse};
use super::params::QueryParams;
use super::query::{DatasetQuery, FeedQuery, SearchQuery, validate_id};
use super::rate_limit::check_rate_limit;
use super::request::{RetryPolicy, build_get, build_token_exchange};
use super::token::TokenManager;
use super::transport::{HttpTransport, OutboundRequest, RawResponse, Transport};
use crate::config::Config;
use crate::error::{ApiError, AuthError, Result, extract_message};
use crate::normalize::{Cell, Table, normalize};

/// Mobility Database API client
pub struct MobdbClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    tokens: TokenManager,
    retry: RetryPolicy,
}

impl MobdbClient {
    /// Create a client over HTTPS from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;

        Ok(Self::with_transport(Arc::new(transport), config.api_base_url())
            .with_token_manager(TokenManager::new(config.refresh_token.clone()))
            .with_retry(config.retry_policy()))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: TokenManager::new(None),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_token_manager(mut self, tokens: TokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Set the session refresh credential; the next request re-derives
    /// its access credential.
    pub async fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        self.tokens.set_refresh_token(refresh_token).await;
    }

    /// Current access credential, exchanging for a new one if needed
    pub async fn access_token(&self, force: bool) -> Result<String> {
        self.tokens.access_token(self, force).await
    }

    /// Send with bounded retry on network errors, 429 and 5xx.
    ///
    /// Each attempt is cut off at whatever is left of `max_elapsed`, so the
    /// whole call never runs past it. Any other response, success or not,
    /// is returned for the caller to interpret.
    async fn send_with_retry(&self, request: &OutboundRequest) -> Result<RawResponse> {
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            debug!("{} {} (attempt {})", request.method, request.url, attempt);

            let remaining = self.retry.max_elapsed.saturating_sub(started.elapsed());
            let sent = match tokio::time::timeout(remaining, self.transport.send(request)).await {
                Ok(sent) => sent,
                Err(_) => {
                    debug!("Retry budget exhausted for {}", request.url);
                    return Err(ApiError::Network(format!(
                        "no response within {:?}",
                        self.retry.max_elapsed
                    ))
                    .into());
                }
            };

            let error = match sent {
                Ok(response) if !is_retryable_status(response.status) => return Ok(response),
                Ok(response) => {
                    check_rate_limit(&response);
                    response.into_error()
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.retry.max_attempts {
                return Err(error.into());
            }

            let delay = match &error {
                ApiError::RateLimited(retry_after) => {
                    (*retry_after).max(self.retry.backoff(attempt))
                }
                _ => self.retry.backoff(attempt),
            };
            if started.elapsed() + delay > self.retry.max_elapsed {
                debug!("Retry budget exhausted for {}", request.url);
                return Err(error.into());
            }

            warn!("{}; retrying in {:?}", error, delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Authenticated GET returning the parsed JSON body.
    ///
    /// A 401 forces one credential refresh and one replay.
    async fn get_json(&self, path: &str, params: &QueryParams) -> Result<Value> {
        let token = self.access_token(false).await?;
        let mut response = self
            .send_with_retry(&build_get(&self.base_url, path, params, &token))
            .await?;

        if response.status == 401 {
            debug!("Access credential rejected; refreshing");
            let token = self.access_token(true).await?;
            response = self
                .send_with_retry(&build_get(&self.base_url, path, params, &token))
                .await?;

            if response.status == 401 {
                self.tokens.clear_access_token().await;
                return Err(AuthError::Rejected(extract_message(&response.body)).into());
            }
        }

        check_rate_limit(&response);

        if !response.is_success() {
            return Err(response.into_error().into());
        }
        Ok(response.body_json()?)
    }

    async fn get_table(&self, path: &str, params: &QueryParams) -> Result<Table> {
        let body = self.get_json(path, params).await?;
        Ok(normalize(body))
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// Drop rows not marked official.
///
/// Runs even though the server was sent the same filter. A table with no
/// `official` column at all is left alone.
fn retain_official(table: &mut Table) {
    if !table.columns().iter().any(|c| c == "official") {
        debug!("No official column in response; keeping server-filtered rows");
        return;
    }
    let before = table.len();
    table.retain_rows(|row| row.get("official").and_then(Cell::as_bool) == Some(true));
    if table.len() < before {
        debug!("Dropped {} unofficial rows", before - table.len());
    }
}

#[async_trait]
impl AuthApi for MobdbClient {
    async fn exchange_token(&self, refresh_token: &str) -> Result<AccessToken> {
        let request = build_token_exchange(&self.base_url, refresh_token);
        let response = self.transport.send(&request).await?;

        match response.status {
            401 | 403 => {
                return Err(AuthError::Rejected(extract_message(&response.body)).into());
            }
            _ if !response.is_success() => return Err(response.into_error().into()),
            _ => {}
        }

        let body: TokenResponse =
            serde_json::from_str(&response.body).map_err(|_| AuthError::ExchangeFailed)?;
        body.into_access_token()
            .ok_or_else(|| AuthError::ExchangeFailed.into())
    }
}

#[async_trait]
impl CatalogApi for MobdbClient {
    async fn list_feeds(&self, query: &FeedQuery) -> Result<Table> {
        query.validate()?;
        let mut table = self.get_table(query.path(), &query.to_params()).await?;
        if query.is_official == Some(true) {
            retain_official(&mut table);
        }
        Ok(table)
    }

    async fn get_feed(&self, feed_id: &str) -> Result<Table> {
        validate_id("feed_id", feed_id)?;
        self.get_table(&format!("/feeds/{}", feed_id), &QueryParams::new())
            .await
    }

    async fn list_datasets(&self, query: &DatasetQuery) -> Result<Table> {
        query.validate()?;
        self.get_table(&query.path(), &query.to_params()).await
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Table> {
        validate_id("dataset_id", dataset_id)?;
        self.get_table(&format!("/datasets/gtfs/{}", dataset_id), &QueryParams::new())
            .await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Table> {
        query.validate()?;
        let mut table = self.get_table("/search", &query.to_params()).await?;
        if query.is_official == Some(true) {
            retain_official(&mut table);
        }
        Ok(table)
    }
}
