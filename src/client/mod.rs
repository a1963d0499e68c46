//! Mobility Database API client

pub mod api;
#[cfg(test)]
pub mod mock;
pub mod mobdb;
pub mod models;
pub mod params;
pub mod query;
pub mod rate_limit;
pub mod request;
pub mod token;
pub mod transport;

pub use api::{AuthApi, CatalogApi};
#[cfg(test)]
#[allow(unused_imports)]
pub use mock::{MockTransport, mock_client};
pub use mobdb::MobdbClient;
pub use params::QueryParams;
pub use query::{
    BoundingBox, BoundingFilterMethod, DatasetQuery, FeedKind, FeedQuery, FetchOptions,
    SearchQuery,
};
pub use rate_limit::RateLimitStatus;
pub use request::RetryPolicy;
pub use token::TokenManager;
pub use transport::{HttpTransport, OutboundRequest, RawResponse, Transport};
