//! Single-page scrape request and response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ApiResponse, Location, PageMetadata};

/// Body for `POST /scrape`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<String>,
    pub only_main_content: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub wait_for: u64,
    pub mobile: bool,
    pub skip_tls_verification: bool,
    pub timeout: u64,
    /// Browser actions, passed through as given
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub remove_base64_images: bool,
    pub block_ads: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl ScrapeRequest {
    /// A request with the API's default options
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            formats: vec!["markdown".to_string()],
            only_main_content: true,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            headers: BTreeMap::new(),
            wait_for: 5000,
            mobile: false,
            skip_tls_verification: false,
            timeout: 30000,
            actions: Vec::new(),
            location: None,
            remove_base64_images: true,
            block_ads: true,
            proxy: None,
        }
    }
}

/// Scraped page content, keyed by format name (`markdown`, `html`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeData {
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(flatten)]
    pub formats: BTreeMap<String, Value>,
}

impl ScrapeData {
    /// Content for one format; non-string payloads are pretty-printed JSON.
    ///
    /// `links` is a named field rather than a flattened format, so it is
    /// looked up there.
    pub fn content(&self, format: &str) -> Option<String> {
        if format == "links" {
            if self.links.is_empty() {
                return None;
            }
            return serde_json::to_string_pretty(&self.links).ok();
        }

        match self.formats.get(format)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => serde_json::to_string_pretty(other).ok(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_none()
            && self.links.is_empty()
            && self.warning.is_none()
            && self.formats.is_empty()
    }
}

/// Response to `POST /scrape`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ScrapeData>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse for ScrapeResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_format_reads_links_field() {
        let data: ScrapeData = serde_json::from_str(
            r#"{"links": ["https://a.com", "https://b.com"], "markdown": "text"}"#,
        )
        .unwrap();

        assert_eq!(data.links.len(), 2);
        assert!(!data.formats.contains_key("links"));
        let content = data.content("links").unwrap();
        assert!(content.contains("\"https://a.com\""));
        assert!(content.contains("\"https://b.com\""));
        assert_eq!(data.content("markdown").as_deref(), Some("text"));

        let empty: ScrapeData = serde_json::from_str(r#"{"links": []}"#).unwrap();
        assert_eq!(empty.content("links"), None);
    }

    #[test]
    fn test_default_request_omits_optional_fields() {
        let json = serde_json::to_value(ScrapeRequest::new("https://example.com")).unwrap();
        assert_eq!(json["formats"], serde_json::json!(["markdown"]));
        assert_eq!(json["onlyMainContent"], true);
        assert_eq!(json["skipTlsVerification"], false);
        for absent in ["includeTags", "excludeTags", "headers", "actions", "location", "proxy"] {
            assert!(json.get(absent).is_none(), "{} should be omitted", absent);
        }
    }

    #[test]
    fn test_data_formats_are_flattened() {
        let resp: ScrapeResponse = serde_json::from_str(
            r#"{
                "success": true,
                "data": {
                    "markdown": "Hello",
                    "html": "<p>Hello</p>",
                    "metadata": {"title": "Greeting"},
                    "links": ["https://example.com/a"]
                }
            }"#,
        )
        .unwrap();

        let data = resp.data.unwrap();
        assert_eq!(data.content("markdown").as_deref(), Some("Hello"));
        assert_eq!(data.content("html").as_deref(), Some("<p>Hello</p>"));
        assert_eq!(data.content("rawHtml"), None);
        assert_eq!(data.links.len(), 1);
        assert!(!data.formats.contains_key("metadata"));
    }

    #[test]
    fn test_json_format_content_is_pretty_printed() {
        let data: ScrapeData = serde_json::from_str(r#"{"json": {"price": 10}}"#).unwrap();
        let content = data.content("json").unwrap();
        assert!(content.contains("\"price\": 10"));
    }
}
