//! Mobility Database API data models
//!
//! Typed views over normalized rows. Endpoint calls return a
//! [`Table`](crate::normalize::Table); use
//! [`Table::rows_as`](crate::normalize::Table::rows_as) to get these.

mod auth;
mod dataset;
mod feed;

pub use auth::{AccessToken, TokenResponse};
pub use dataset::{DatasetBoundingBox, GtfsDataset, ValidationReport};
pub use feed::{Feed, LatestDataset, Location, SourceInfo};
