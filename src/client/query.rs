//! Typed endpoint queries
//!
//! Each query validates itself before any network call and renders to
//! [`QueryParams`] for both the outbound request and the cache key.

use std::time::Duration;

use serde_json::Value;

use super::params::QueryParams;
use crate::error::ValidationError;

type Result<T> = std::result::Result<T, ValidationError>;

/// Per-call cache behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchOptions {
    /// Consult the cache before fetching (default: true)
    pub use_cache: bool,
    /// Override the endpoint-class TTL for this call
    pub max_age: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            max_age: None,
        }
    }
}

impl FetchOptions {
    /// Skip the cache lookup and fetch live. The fresh result still replaces
    /// the cached entry.
    pub fn no_cache() -> Self {
        Self {
            use_cache: false,
            max_age: None,
        }
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Kind of feed, selecting the listing endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Every feed type
    #[default]
    All,
    /// GTFS schedule
    Gtfs,
    /// GTFS Realtime
    GtfsRt,
    /// General Bikeshare Feed Specification
    Gbfs,
}

impl FeedKind {
    /// Listing path for this kind
    pub fn path(&self) -> &'static str {
        match self {
            FeedKind::All => "/feeds",
            FeedKind::Gtfs => "/gtfs_feeds",
            FeedKind::GtfsRt => "/gtfs_rt_feeds",
            FeedKind::Gbfs => "/gbfs_feeds",
        }
    }

    /// Value of the `data_type` filter; `None` for [`FeedKind::All`]
    pub fn data_type(&self) -> Option<&'static str> {
        match self {
            FeedKind::All => None,
            FeedKind::Gtfs => Some("gtfs"),
            FeedKind::GtfsRt => Some("gtfs_rt"),
            FeedKind::Gbfs => Some("gbfs"),
        }
    }

    fn label(&self) -> &'static str {
        self.data_type().unwrap_or("all")
    }
}

/// How a bounding box matches a dataset's extent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundingFilterMethod {
    #[default]
    CompletelyEnclosed,
    PartiallyEnclosed,
    Disjoint,
}

impl BoundingFilterMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundingFilterMethod::CompletelyEnclosed => "completely_enclosed",
            BoundingFilterMethod::PartiallyEnclosed => "partially_enclosed",
            BoundingFilterMethod::Disjoint => "disjoint",
        }
    }
}

/// Geographic filter for GTFS feed listings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub method: BoundingFilterMethod,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            method: BoundingFilterMethod::default(),
        }
    }

    pub fn method(mut self, method: BoundingFilterMethod) -> Self {
        self.method = method;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for lat in [self.min_lat, self.max_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ValidationError::Latitude(lat));
            }
        }
        for lon in [self.min_lon, self.max_lon] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ValidationError::Longitude(lon));
            }
        }
        if self.min_lat > self.max_lat {
            return Err(ValidationError::InvertedRange {
                field: "latitude",
                min: self.min_lat,
                max: self.max_lat,
            });
        }
        if self.min_lon > self.max_lon {
            return Err(ValidationError::InvertedRange {
                field: "longitude",
                min: self.min_lon,
                max: self.max_lon,
            });
        }
        Ok(())
    }

    /// `dataset_latitudes` value: `min,max`
    pub fn latitudes(&self) -> String {
        format!("{},{}", self.min_lat, self.max_lat)
    }

    /// `dataset_longitudes` value: `min,max`
    pub fn longitudes(&self) -> String {
        format!("{},{}", self.min_lon, self.max_lon)
    }
}

/// Filters for feed listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedQuery {
    pub kind: FeedKind,
    pub provider: Option<String>,
    pub producer_url: Option<String>,
    pub country_code: Option<String>,
    pub subdivision_name: Option<String>,
    pub municipality: Option<String>,
    pub status: Option<String>,
    /// Official feeds only when `Some(true)`
    pub is_official: Option<bool>,
    /// GTFS-RT entity types (`vp`, `tu`, `sa`)
    pub entity_types: Vec<String>,
    /// GTFS only
    pub bounding_box: Option<BoundingBox>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FeedQuery {
    pub fn new(kind: FeedKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn producer_url(mut self, url: impl Into<String>) -> Self {
        self.producer_url = Some(url.into());
        self
    }

    pub fn country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn subdivision_name(mut self, name: impl Into<String>) -> Self {
        self.subdivision_name = Some(name.into());
        self
    }

    pub fn municipality(mut self, name: impl Into<String>) -> Self {
        self.municipality = Some(name.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn official(mut self, official: bool) -> Self {
        self.is_official = Some(official);
        self
    }

    pub fn entity_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn path(&self) -> &'static str {
        self.kind.path()
    }

    pub fn validate(&self) -> Result<()> {
        validate_limit(self.limit)?;

        if let Some(bbox) = &self.bounding_box {
            if self.kind != FeedKind::Gtfs {
                return Err(ValidationError::Conflict(
                    "bounding box filters only apply to GTFS schedule feeds".to_string(),
                ));
            }
            bbox.validate()?;
        }

        if !self.entity_types.is_empty() && self.kind != FeedKind::GtfsRt {
            return Err(ValidationError::Conflict(
                "entity types only apply to GTFS Realtime feeds".to_string(),
            ));
        }

        if let Some(code) = &self.country_code
            && (code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(ValidationError::Conflict(format!(
                "country code {:?} must be a two-letter ISO 3166-1 code",
                code
            )));
        }

        Ok(())
    }

    /// Query string parameters, nulls included for unset filters
    pub fn to_params(&self) -> QueryParams {
        let entity_types = (!self.entity_types.is_empty())
            .then(|| Value::from(self.entity_types.clone()));

        QueryParams::new()
            .with_opt("provider", self.provider.clone())
            .with_opt("producer_url", self.producer_url.clone())
            .with_opt("country_code", self.country_code.clone())
            .with_opt("subdivision_name", self.subdivision_name.clone())
            .with_opt("municipality", self.municipality.clone())
            .with_opt("status", self.status.clone())
            .with_opt("is_official", self.is_official)
            .with_opt("entity_types", entity_types)
            .with_opt("dataset_latitudes", self.bounding_box.map(|b| b.latitudes()))
            .with_opt("dataset_longitudes", self.bounding_box.map(|b| b.longitudes()))
            .with_opt(
                "bounding_filter_method",
                self.bounding_box.map(|b| b.method.as_str()),
            )
            .with_opt("limit", self.limit)
            .with_opt("offset", self.offset)
    }

    /// Cache key parameters: query parameters plus the feed kind
    pub fn cache_params(&self) -> QueryParams {
        self.to_params().with("feed_type", self.kind.label())
    }
}

/// Filters for a feed's dataset history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetQuery {
    pub feed_id: String,
    /// Only the most recent dataset
    pub latest: Option<bool>,
    pub downloaded_after: Option<String>,
    pub downloaded_before: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DatasetQuery {
    pub fn new(feed_id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            ..Self::default()
        }
    }

    pub fn latest(mut self, latest: bool) -> Self {
        self.latest = Some(latest);
        self
    }

    pub fn downloaded_after(mut self, date: impl Into<String>) -> Self {
        self.downloaded_after = Some(date.into());
        self
    }

    pub fn downloaded_before(mut self, date: impl Into<String>) -> Self {
        self.downloaded_before = Some(date.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn path(&self) -> String {
        format!("/gtfs_feeds/{}/datasets", self.feed_id)
    }

    pub fn validate(&self) -> Result<()> {
        validate_id("feed_id", &self.feed_id)?;
        validate_limit(self.limit)?;

        if self.latest == Some(true)
            && (self.downloaded_after.is_some() || self.downloaded_before.is_some())
        {
            return Err(ValidationError::Conflict(
                "latest cannot be combined with a download date window".to_string(),
            ));
        }
        Ok(())
    }

    /// Query string parameters (the feed ID travels in the path)
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with_opt("latest", self.latest)
            .with_opt("downloaded_after", self.downloaded_after.clone())
            .with_opt("downloaded_before", self.downloaded_before.clone())
            .with_opt("limit", self.limit)
            .with_opt("offset", self.offset)
    }

    pub fn cache_params(&self) -> QueryParams {
        self.to_params().with("feed_id", self.feed_id.clone())
    }
}

/// Full-text catalog search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub search_query: Option<String>,
    pub feed_id: Option<String>,
    pub kind: FeedKind,
    pub status: Option<String>,
    pub is_official: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SearchQuery {
    pub fn new(search_query: impl Into<String>) -> Self {
        Self {
            search_query: Some(search_query.into()),
            ..Self::default()
        }
    }

    pub fn feed_id(mut self, feed_id: impl Into<String>) -> Self {
        self.feed_id = Some(feed_id.into());
        self
    }

    pub fn kind(mut self, kind: FeedKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn official(mut self, official: bool) -> Self {
        self.is_official = Some(official);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_limit(self.limit)?;
        if let Some(id) = &self.feed_id {
            validate_id("feed_id", id)?;
        }
        if self.search_query.as_deref().is_some_and(|q| q.trim().is_empty()) {
            return Err(ValidationError::Empty {
                field: "search_query",
            });
        }
        Ok(())
    }

    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with_opt("search_query", self.search_query.clone())
            .with_opt("feed_id", self.feed_id.clone())
            .with_opt("data_type", self.kind.data_type())
            .with_opt("status", self.status.clone())
            .with_opt("is_official", self.is_official)
            .with_opt("limit", self.limit)
            .with_opt("offset", self.offset)
    }
}

/// Check that an ID is usable as a path segment.
pub fn validate_id(field: &'static str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if id.contains(['/', '?', '#']) || id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidId {
            field,
            value: id.to_string(),
        });
    }
    Ok(())
}

fn validate_limit(limit: Option<u32>) -> Result<()> {
    if limit == Some(0) {
        return Err(ValidationError::NotPositive { field: "limit" });
    }
    Ok(())
}
