//! Cached wrapper for the catalog client
//!
//! Looks up the derived key before fetching and stores every successful
//! fetch, using the endpoint class to pick the prefix and TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{CacheEntryInfo, CacheStorage, CacheTtl, ClearStats, EndpointClass, cache_key};
use crate::client::query::validate_id;
use crate::client::{
    CatalogApi, DatasetQuery, FeedQuery, FetchOptions, MobdbClient, QueryParams, SearchQuery,
};
use crate::config::Config;
use crate::error::Result;
use crate::normalize::Table;

/// Cached wrapper for any [`CatalogApi`] implementation.
///
/// Without storage every call goes to the inner client. With
/// `use_cache = false` the lookup is skipped but the fresh result still
/// replaces the stored entry.
pub struct CachedMobdbClient<C: CatalogApi> {
    inner: Arc<C>,
    storage: Option<CacheStorage>,
    ttl: CacheTtl,
}

impl<C: CatalogApi> CachedMobdbClient<C> {
    /// Create a new cached client wrapper.
    ///
    /// # Arguments
    /// * `inner` - The underlying API client to wrap
    /// * `storage` - Where entries live; `None` disables caching
    pub fn new(inner: C, storage: Option<CacheStorage>) -> Self {
        Self {
            inner: Arc::new(inner),
            storage,
            ttl: CacheTtl::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: CacheTtl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Get the inner client (for operations outside [`CatalogApi`], like
    /// `set_refresh_token`)
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn storage(&self) -> Option<&CacheStorage> {
        self.storage.as_ref()
    }

    pub fn ttl(&self) -> &CacheTtl {
        &self.ttl
    }

    /// Try to get cached data
    fn get_cached(&self, key: &str, class: EndpointClass, opts: &FetchOptions) -> Option<Table> {
        if !opts.use_cache {
            return None;
        }
        let storage = self.storage.as_ref()?;
        let max_age = opts.max_age.unwrap_or(self.ttl.for_class(class));
        storage.read(key, Some(hours(max_age)))
    }

    /// Store data in cache
    fn set_cached(&self, key: &str, table: &Table) {
        if let Some(ref storage) = self.storage
            && let Err(e) = storage.write(table, key)
        {
            log::warn!("Failed to cache {}: {}", key, e);
        }
    }

    /// Serve from cache, or await `fetch` and store its result.
    ///
    /// `fetch` is not polled on a hit.
    async fn fetch_through<F>(
        &self,
        class: EndpointClass,
        params: &QueryParams,
        opts: &FetchOptions,
        fetch: F,
    ) -> Result<Table>
    where
        F: Future<Output = Result<Table>>,
    {
        let key = cache_key(class.prefix(), params);

        if let Some(cached) = self.get_cached(&key, class, opts) {
            log::debug!("Cache hit: {}", key);
            return Ok(cached);
        }
        log::debug!("Cache miss: {}", key);

        let table = fetch.await?;
        self.set_cached(&key, &table);
        Ok(table)
    }

    /// List feeds [feeds]
    pub async fn list_feeds(&self, query: &FeedQuery, opts: &FetchOptions) -> Result<Table> {
        query.validate()?;
        self.fetch_through(
            EndpointClass::Feeds,
            &query.cache_params(),
            opts,
            self.inner.list_feeds(query),
        )
        .await
    }

    /// Fetch one feed [feeds]
    pub async fn get_feed(&self, feed_id: &str, opts: &FetchOptions) -> Result<Table> {
        validate_id("feed_id", feed_id)?;
        self.fetch_through(
            EndpointClass::Feeds,
            &QueryParams::new().with("feed_id", feed_id),
            opts,
            self.inner.get_feed(feed_id),
        )
        .await
    }

    /// List a feed's datasets [datasets]
    pub async fn list_datasets(&self, query: &DatasetQuery, opts: &FetchOptions) -> Result<Table> {
        query.validate()?;
        self.fetch_through(
            EndpointClass::Datasets,
            &query.cache_params(),
            opts,
            self.inner.list_datasets(query),
        )
        .await
    }

    /// Fetch one dataset [datasets]
    pub async fn get_dataset(&self, dataset_id: &str, opts: &FetchOptions) -> Result<Table> {
        validate_id("dataset_id", dataset_id)?;
        self.fetch_through(
            EndpointClass::Datasets,
            &QueryParams::new().with("dataset_id", dataset_id),
            opts,
            self.inner.get_dataset(dataset_id),
        )
        .await
    }

    /// Search the catalog [search]
    pub async fn search(&self, query: &SearchQuery, opts: &FetchOptions) -> Result<Table> {
        query.validate()?;
        self.fetch_through(
            EndpointClass::Search,
            &query.to_params(),
            opts,
            self.inner.search(query),
        )
        .await
    }

    /// Delete entries, all of them or only those older than `older_than_days`
    pub fn clear_cache(&self, older_than_days: Option<f64>) -> Result<ClearStats> {
        match &self.storage {
            Some(storage) => Ok(storage.clear(older_than_days)?),
            None => Ok(ClearStats { entries_removed: 0 }),
        }
    }

    /// Stored entries, newest first
    pub fn cache_entries(&self) -> Result<Vec<CacheEntryInfo>> {
        match &self.storage {
            Some(storage) => Ok(storage.list_entries()?),
            None => Ok(Vec::new()),
        }
    }
}

impl CachedMobdbClient<MobdbClient> {
    /// Live client plus cache, both from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let inner = MobdbClient::new(config)?;
        let storage = CacheStorage::new(config.cache.dir.clone());

        Ok(Self::new(inner, Some(storage)).with_ttl(config.cache_ttl()))
    }

    /// Set the session refresh credential
    pub async fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        self.inner.set_refresh_token(refresh_token).await;
    }
}

fn hours(duration: Duration) -> f64 {
    duration.as_secs_f64() / 3600.0
}
