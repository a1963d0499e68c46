//! Dataset models

use serde::{Deserialize, Serialize};

/// An immutable, timestamped snapshot of a GTFS feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtfsDataset {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date_range_start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date_range_end: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<DatasetBoundingBox>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_report: Option<ValidationReport>,
}

/// Geographic extent of a dataset's stops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetBoundingBox {
    pub minimum_latitude: f64,
    pub maximum_latitude: f64,
    pub minimum_longitude: f64,
    pub maximum_longitude: f64,
}

/// Summary of the canonical GTFS validator run on a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_version: Option<String>,

    #[serde(default)]
    pub total_error: u64,

    #[serde(default)]
    pub total_warning: u64,

    #[serde(default)]
    pub total_info: u64,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_json: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_html: Option<String>,
}
