//! mobdb - client for the Mobility Database transit feed catalog
//!
//! Authenticates with a refresh credential, queries the read-only catalog
//! endpoints, normalizes every response envelope into one [`Table`] shape
//! and caches results on disk with per-endpoint-class freshness.
//!
//! ```no_run
//! use mobdb::{CachedMobdbClient, Config, FeedKind, FeedQuery, FetchOptions};
//!
//! # async fn run() -> mobdb::Result<()> {
//! let client = CachedMobdbClient::from_config(&Config::load_or_default()?)?;
//! let feeds = client
//!     .list_feeds(&FeedQuery::new(FeedKind::Gtfs).country_code("CA"), &FetchOptions::default())
//!     .await?;
//! println!("{} feeds", feeds.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;

pub use cache::{CacheStorage, CacheTtl, CachedMobdbClient, EndpointClass, cache_key};
pub use client::models::{Feed, GtfsDataset, Location, ValidationReport};
pub use client::{
    BoundingBox, BoundingFilterMethod, CatalogApi, DatasetQuery, FeedKind, FeedQuery,
    FetchOptions, HttpTransport, MobdbClient, QueryParams, RetryPolicy, SearchQuery,
    TokenManager, Transport,
};
pub use config::Config;
pub use error::{Error, Result};
pub use normalize::{Cell, Table, normalize};
