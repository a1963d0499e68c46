//! Catalog API trait for the read-only endpoints

use async_trait::async_trait;

use crate::client::query::{DatasetQuery, FeedQuery, SearchQuery};
use crate::error::Result;
use crate::normalize::Table;

/// Read-only catalog operations.
///
/// Every call validates its query before touching the network and returns
/// a normalized [`Table`] whatever envelope the endpoint used.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List feeds, optionally narrowed to one feed kind
    async fn list_feeds(&self, query: &FeedQuery) -> Result<Table>;

    /// Fetch one feed by ID
    async fn get_feed(&self, feed_id: &str) -> Result<Table>;

    /// List the dataset history of a GTFS feed
    async fn list_datasets(&self, query: &DatasetQuery) -> Result<Table>;

    /// Fetch one GTFS dataset by ID
    async fn get_dataset(&self, dataset_id: &str) -> Result<Table>;

    /// Full-text catalog search
    async fn search(&self, query: &SearchQuery) -> Result<Table>;
}
