//! Configuration management for mobdb

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheTtl;
use crate::client::RetryPolicy;
use crate::error::{ConfigError, Result};

/// Environment variable holding the long-lived refresh credential
pub const ENV_REFRESH_TOKEN: &str = "MOBDB_REFRESH_TOKEN";

/// Environment variable overriding the cache directory
pub const ENV_CACHE_PATH: &str = "MOBDB_CACHE_PATH";

/// Environment variable overriding the API base URL
pub const ENV_API_HOST: &str = "MOBDB_API_HOST";

/// Mobility Database API base URL
pub const DEFAULT_API_HOST: &str = "https://api.mobilitydatabase.org/v1";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Refresh credential; takes precedence over MOBDB_REFRESH_TOKEN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// API base URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Cache location and freshness settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Cache directory; MOBDB_CACHE_PATH wins over this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub ttl: TtlSettings,
}

/// Maximum freshness per endpoint class, in hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlSettings {
    #[serde(default = "default_feeds_hours")]
    pub feeds: f64,

    #[serde(default = "default_search_hours")]
    pub search: f64,

    #[serde(default = "default_datasets_hours")]
    pub datasets: f64,
}

/// Bounded retry for idempotent requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_max_elapsed_secs")]
    pub max_elapsed_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_feeds_hours() -> f64 {
    CacheTtl::FEEDS.as_secs_f64() / 3600.0
}

fn default_search_hours() -> f64 {
    CacheTtl::SEARCH.as_secs_f64() / 3600.0
}

fn default_datasets_hours() -> f64 {
    CacheTtl::DATASETS.as_secs_f64() / 3600.0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_elapsed_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_token: None,
            api_host: None,
            cache: CacheSettings::default(),
            retry: RetrySettings::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            feeds: default_feeds_hours(),
            search: default_search_hours(),
            datasets: default_datasets_hours(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_elapsed_secs: default_max_elapsed_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path (~/.mobdb/config.yaml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".mobdb").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from the default path, or defaults if there is none
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // The file may hold the refresh credential
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Resolved API base URL: MOBDB_API_HOST > config > default
    pub fn api_base_url(&self) -> String {
        std::env::var(ENV_API_HOST)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api_host.clone())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Endpoint-class TTLs from the configured hours
    pub fn cache_ttl(&self) -> CacheTtl {
        let ttl = &self.cache.ttl;
        CacheTtl {
            feeds: hours(ttl.feeds),
            search: hours(ttl.search),
            datasets: hours(ttl.datasets),
        }
    }

    /// Retry policy from the configured bounds
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            max_elapsed: Duration::from_secs(self.retry.max_elapsed_secs),
            ..RetryPolicy::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        let ttl = &self.cache.ttl;
        for (name, value) in [
            ("feeds", ttl.feeds),
            ("search", ttl.search),
            ("datasets", ttl.datasets),
        ] {
            if !value.is_finite() || !(0.0..=max_ttl_hours()).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "cache.ttl.{} must be between 0 and {:.0} hours",
                    name,
                    max_ttl_hours()
                ))
                .into());
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(
                ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()).into(),
            );
        }
        Ok(())
    }
}

/// Largest TTL in hours that fits in a `Duration`
fn max_ttl_hours() -> f64 {
    Duration::MAX.as_secs_f64() / 3600.0
}

fn hours(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0) * 3600.0).unwrap_or(Duration::MAX)
}
