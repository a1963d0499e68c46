//! Local cache for API responses
//!
//! One gzip-compressed JSON file per response in a single directory. The
//! directory listing is the index and file modification time is the entry's
//! age; there is no manifest.
//!
//! Concurrent processes writing the same key race with last-writer-wins
//! semantics. Writes go through a temp file and rename, so a reader never
//! sees a half-written entry, but no locking is attempted.

pub mod client;
pub mod key;
pub mod storage;

use std::time::Duration;

/// Category of catalog resource, used to pick a freshness policy and a key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Feed listings and single-feed lookups
    Feeds,
    /// Full-text search results
    Search,
    /// Historical dataset snapshots
    Datasets,
}

impl EndpointClass {
    pub const ALL: [EndpointClass; 3] = [
        EndpointClass::Feeds,
        EndpointClass::Search,
        EndpointClass::Datasets,
    ];

    /// Prefix used for cache file names of this class
    pub fn prefix(&self) -> &'static str {
        match self {
            EndpointClass::Feeds => "feeds",
            EndpointClass::Search => "search",
            EndpointClass::Datasets => "datasets",
        }
    }
}

/// Cache TTL configuration per endpoint class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheTtl {
    pub feeds: Duration,
    pub search: Duration,
    pub datasets: Duration,
}

impl CacheTtl {
    // Feed metadata changes occasionally
    pub const FEEDS: Duration = Duration::from_secs(60 * 60); // 1 hr

    // Search ranking and matches move faster
    pub const SEARCH: Duration = Duration::from_secs(30 * 60); // 30 min

    // Datasets are immutable snapshots
    pub const DATASETS: Duration = Duration::from_secs(24 * 60 * 60); // 24 hr

    /// Maximum freshness for an endpoint class
    pub fn for_class(&self, class: EndpointClass) -> Duration {
        match class {
            EndpointClass::Feeds => self.feeds,
            EndpointClass::Search => self.search,
            EndpointClass::Datasets => self.datasets,
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            feeds: Self::FEEDS,
            search: Self::SEARCH,
            datasets: Self::DATASETS,
        }
    }
}

pub use client::CachedMobdbClient;
pub use key::{CACHE_EXTENSION, cache_key};
pub use storage::{CacheEntryInfo, CacheStorage, ClearStats};
