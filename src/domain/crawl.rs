//! Crawl job request and responses.

use serde::{Deserialize, Serialize};

use super::common::{ApiResponse, JobStatus, PageMetadata, ScrapeOptions};

/// Body for `POST /crawl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub url: String,

    /// Omitted from the payload when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,

    /// Omitted from the payload when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,

    pub max_depth: u32,
    pub ignore_sitemap: bool,
    pub ignore_query_parameters: bool,
    pub limit: u32,
    pub allow_backward_links: bool,
    pub allow_external_links: bool,
    pub scrape_options: ScrapeOptions,
}

/// Response to `POST /crawl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
}

impl ApiResponse for CrawlResponse {}

/// One crawled page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlDocument {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

/// Response to `GET /crawl/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatusResponse {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub credits_used: u64,
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Cursor for the next page of results on large crawls
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub data: Vec<CrawlDocument>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse for CrawlStatusResponse {
    fn from_api_error(message: String) -> Option<Self> {
        Some(Self {
            status: JobStatus::Error,
            error: Some(message),
            ..Default::default()
        })
    }
}
