//! Error types for the mobdb client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for mobdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is a 404 from the catalog ("no such feed/dataset").
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api(ApiError::NotFound(_)))
    }
}

/// Caller supplied malformed or contradictory parameters.
///
/// Raised before any network call is made.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("latitude {0} is outside [-90, 90]. Check the order of your bounding box values.")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]. Check the order of your bounding box values.")]
    Longitude(f64),

    #[error("{field}: minimum {min} is greater than maximum {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{field} {value:?} is not a valid ID")]
    InvalidId { field: &'static str, value: String },

    #[error("Conflicting filters: {0}")]
    Conflict(String),
}

/// Credential resolution and exchange failures. Never retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "No refresh credential configured. Set one with `set_refresh_token` or the MOBDB_REFRESH_TOKEN environment variable."
    )]
    MissingRefreshToken,

    #[error(
        "Failed to generate access credential; check refresh credential validity at https://mobilitydatabase.org/account"
    )]
    ExchangeFailed,

    #[error("Credential exchange rejected: {0}. Check refresh credential validity.")]
    Rejected(String),
}

/// Upstream API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}. Check the feed or dataset ID, or broaden your search parameters.")]
    NotFound(String),

    #[error("Mobility Database API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimited(Duration),

    #[error("Network error: {0}. Check your connection and try again.")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Fallback message when an error body carries neither `detail` nor `message`.
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Mobility Database API request failed";

impl ApiError {
    /// Translate a non-2xx response into an error carrying a readable message.
    ///
    /// The message prefers a `detail` field, then `message`, then a fixed string.
    pub fn from_response(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = extract_message(body);
        match status {
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited(retry_after.unwrap_or(Duration::from_secs(60))),
            _ => ApiError::Upstream { status, message },
        }
    }

    /// Whether the transport's bounded retry should try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::RateLimited(_) => true,
            ApiError::Upstream { status, .. } => *status >= 500,
            ApiError::NotFound(_) | ApiError::InvalidResponse(_) => false,
        }
    }
}

pub(crate) fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return GENERIC_UPSTREAM_MESSAGE.to_string();
    };

    ["detail", "message"]
        .iter()
        .filter_map(|field| value.get(*field))
        .find_map(|v| match v {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| GENERIC_UPSTREAM_MESSAGE.to_string())
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Cache store failures.
///
/// Reads swallow these (a bad entry is a miss); writes and clears surface them.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not determine a cache directory. Set MOBDB_CACHE_PATH to choose one.")]
    NoCacheDir,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache entry could not be decoded: {0}")]
    Corrupt(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
