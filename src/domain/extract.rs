//! Structured extraction job request and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ApiResponse, JobStatus, ScrapeOptions};

/// Body for `POST /extract`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    pub prompt: String,
    /// JSON schema describing the expected output; not validated locally
    #[serde(default = "empty_object")]
    pub schema: Value,
    pub enable_web_search: bool,
    pub ignore_sitemap: bool,
    pub include_subdomains: bool,
    pub show_sources: bool,
    pub scrape_options: ScrapeOptions,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Response to `POST /extract`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub id: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse for ExtractResponse {}

/// Response to `GET /extract/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractStatusResponse {
    pub success: bool,
    /// Extracted object (or list of objects) once the job has finished
    #[serde(default = "empty_object")]
    pub data: Value,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl ApiResponse for ExtractStatusResponse {
    fn from_api_error(message: String) -> Option<Self> {
        Some(Self {
            success: false,
            data: empty_object(),
            status: JobStatus::Error,
            expires_at: None,
            error: Some(message),
            warning: None,
        })
    }
}
