//! URL discovery (map) request and response.

use serde::{Deserialize, Serialize};

use super::common::ApiResponse;

/// Body for `POST /map`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRequest {
    pub url: String,
    /// Only links matching this term; omitted when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search: String,
    pub ignore_sitemap: bool,
    pub sitemap_only: bool,
    pub include_subdomains: bool,
    pub limit: u32,
}

/// Response to `POST /map`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapResponse {
    pub success: bool,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse for MapResponse {}
