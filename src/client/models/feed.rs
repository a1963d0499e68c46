//! Feed models

use serde::{Deserialize, Serialize};

/// A feed in the catalog (GTFS schedule, GTFS-RT or GBFS)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    /// Catalog ID, e.g. `mdb-1210`
    pub id: String,

    /// `gtfs`, `gtfs_rt` or `gbfs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_name: Option<String>,

    /// Whether the feed is flagged as the provider's official source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,

    #[serde(default)]
    pub locations: Vec<Location>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_dataset: Option<LatestDataset>,
}

/// Where the feed is published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_type: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
}

/// One place a feed covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
}

/// Summary of the most recent dataset, embedded in feed listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestDataset {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}
