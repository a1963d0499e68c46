//! Request building and retry policy

use std::time::Duration;

use super::params::QueryParams;
use super::transport::OutboundRequest;

/// Client identification: tool name, crate version and Rust version
pub fn user_agent() -> String {
    format!(
        "mobdb/{} (rust/{})",
        env!("CARGO_PKG_VERSION"),
        option_env!("CARGO_PKG_RUST_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or("unknown")
    )
}

/// Build an authenticated GET for a catalog endpoint.
///
/// Null parameters are dropped from the query string.
pub fn build_get(
    base_url: &str,
    path: &str,
    params: &QueryParams,
    access_token: &str,
) -> OutboundRequest {
    OutboundRequest {
        method: reqwest::Method::GET,
        url: format!("{}{}", base_url, path),
        query: params.to_query_pairs(),
        headers: vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", access_token),
            ),
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), user_agent()),
        ],
        body: None,
    }
}

/// Build the credential exchange POST. It carries no bearer credential.
pub fn build_token_exchange(base_url: &str, refresh_token: &str) -> OutboundRequest {
    OutboundRequest {
        method: reqwest::Method::POST,
        url: format!("{}/tokens", base_url),
        query: Vec::new(),
        headers: vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), user_agent()),
        ],
        body: Some(serde_json::json!({ "refresh_token": refresh_token })),
    }
}

/// Bounded retry for idempotent requests.
///
/// Stops at whichever bound is reached first: `max_attempts` total sends,
/// or `max_elapsed` wall-clock time including backoff sleeps. An attempt
/// still in flight when `max_elapsed` runs out is abandoned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_elapsed: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends once
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry following `attempt` (1-based).
    ///
    /// Doubles each attempt: 1s, 2s, 4s with the default policy.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_shape() {
        let ua = user_agent();
        assert!(ua.starts_with("mobdb/"));
        assert!(ua.contains("(rust/"));
    }

    #[test]
    fn test_build_get_headers() {
        let params = QueryParams::new()
            .with("provider", "TTC")
            .with_opt::<u32>("limit", None);
        let request = build_get("https://api.test/v1", "/feeds", &params, "access-1");

        assert_eq!(request.method, reqwest::Method::GET);
        assert_eq!(request.url, "https://api.test/v1/feeds");
        assert_eq!(request.header("authorization"), Some("Bearer access-1"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.header("user-agent").unwrap().starts_with("mobdb/"));
        assert_eq!(
            request.query,
            vec![("provider".to_string(), "TTC".to_string())]
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_build_token_exchange() {
        let request = build_token_exchange("https://api.test/v1", "refresh-1");
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.url, "https://api.test/v1/tokens");
        assert!(request.header("authorization").is_none());
        assert_eq!(
            request.body,
            Some(serde_json::json!({"refresh_token": "refresh-1"}))
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_secs(u64::MAX / 2),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(40), Duration::MAX);
    }
}
