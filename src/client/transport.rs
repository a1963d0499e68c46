//! HTTP transport seam
//!
//! The live client talks to the network only through [`Transport`], so tests
//! can swap in a canned implementation and count calls.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ApiError;

/// A fully built request, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: reqwest::Method,
    pub url: String,
    /// Query pairs, null parameters already dropped
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// JSON body (credential exchange only)
    pub body: Option<Value>,
}

impl OutboundRequest {
    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// URL path relative to `base`
    pub fn path_under<'a>(&'a self, base: &str) -> &'a str {
        self.url.strip_prefix(base).unwrap_or(&self.url)
    }
}

/// Status, headers and body of a response, read in full
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// A response carrying a JSON body
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `Retry-After` in whole seconds
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Parse the body as JSON. An empty body reads as null.
    pub fn body_json(&self) -> Result<Value, ApiError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Convert a non-2xx response into an error
    pub fn into_error(self) -> ApiError {
        let retry_after = self.retry_after();
        ApiError::from_response(self.status, &self.body, retry_after)
    }
}

/// Sends requests and returns responses of any status.
///
/// Only connection-level failures are errors here; status handling belongs
/// to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError>;
}

/// [`Transport`] over a shared reqwest client
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_headers_case_insensitive() {
        let response = RawResponse::new(200, "").with_header("X-RateLimit-Limit", "100");
        assert_eq!(response.header("x-ratelimit-limit"), Some("100"));
        assert_eq!(response.header("X-RATELIMIT-LIMIT"), Some("100"));
    }

    #[test]
    fn test_retry_after() {
        let response = RawResponse::new(429, "").with_header("Retry-After", "7");
        assert_eq!(response.retry_after(), Some(Duration::from_secs(7)));

        let response = RawResponse::new(429, "").with_header("Retry-After", "soon");
        assert_eq!(response.retry_after(), None);
    }

    #[test]
    fn test_body_json() {
        let response = RawResponse::json(200, &json!({"id": "mdb-1"}));
        assert_eq!(response.body_json().unwrap(), json!({"id": "mdb-1"}));

        assert_eq!(RawResponse::new(204, "").body_json().unwrap(), Value::Null);

        let err = RawResponse::new(200, "{not json").body_json().unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_into_error_uses_retry_after() {
        let err = RawResponse::new(429, "")
            .with_header("retry-after", "5")
            .into_error();
        match err {
            ApiError::RateLimited(d) => assert_eq!(d, Duration::from_secs(5)),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(301, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
    }
}
