//! Firecrawl REST client.
//!
//! Base: https://api.firecrawl.dev/v1
//! Auth: Bearer token
//!
//! All six operations go through `execute`, which looks up the method, path
//! and status-code policy in the `Operation` table. Each call issues exactly
//! one HTTP request; nothing is retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::{FirecrawlError, HttpRequest, HttpResponse, ReqwestTransport, Result, Transport};
use crate::domain::{
    ApiResponse, CrawlRequest, CrawlResponse, CrawlStatusResponse, ExtractRequest,
    ExtractResponse, ExtractStatusResponse, MapRequest, MapResponse, Operation, ScrapeRequest,
    ScrapeResponse,
};

/// Public Firecrawl API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";

const ORIGIN: &str = "openwebui";
const ORIGIN_TYPE: &str = "integration";

/// Firecrawl API client
pub struct FirecrawlClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: RwLock<String>,
    debug: AtomicBool,
}

impl FirecrawlClient {
    /// Create a client using the reqwest transport
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_transport(api_key, Arc::new(ReqwestTransport::new()))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(api_key: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: RwLock::new(api_key.into()),
            debug: AtomicBool::new(false),
        }
    }

    /// Point the client at a different deployment (self-hosted, proxy)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> String {
        self.api_key
            .read()
            .map(|k| k.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key().is_empty()
    }

    pub fn set_api_key(&self, key: impl Into<String>) {
        let mut guard = self.api_key.write().unwrap_or_else(|e| e.into_inner());
        *guard = key.into();
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    /// Start a crawl job
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResponse> {
        self.execute(Operation::CrawlStart, None, Some(to_body(request)?))
            .await
    }

    /// Poll a crawl job
    pub async fn crawl_status(&self, job_id: &str) -> Result<CrawlStatusResponse> {
        self.execute(Operation::CrawlStatus, Some(job_id), None).await
    }

    /// Scrape a single page
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse> {
        self.execute(Operation::Scrape, None, Some(to_body(request)?))
            .await
    }

    /// Discover the URLs of a site
    pub async fn map(&self, request: &MapRequest) -> Result<MapResponse> {
        self.execute(Operation::Map, None, Some(to_body(request)?))
            .await
    }

    /// Start an extraction job
    pub async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        self.execute(Operation::ExtractStart, None, Some(to_body(request)?))
            .await
    }

    /// Poll an extraction job
    pub async fn extract_status(&self, job_id: &str) -> Result<ExtractStatusResponse> {
        self.execute(Operation::ExtractStatus, Some(job_id), None)
            .await
    }

    fn headers(&self, api_key: &str) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), format!("Bearer {}", api_key)),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Origin".to_string(), ORIGIN.to_string()),
            ("X-Origin-Type".to_string(), ORIGIN_TYPE.to_string()),
        ]
    }

    async fn execute<R: ApiResponse>(
        &self,
        operation: Operation,
        job_id: Option<&str>,
        body: Option<Value>,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, operation.path(job_id));
        let api_key = self.api_key();
        let verbose = self.debug();

        if verbose {
            info!(operation = operation.label(), %url, "Endpoint");
            info!("Using API key: {}", redact_key(&api_key));
            if let Some(payload) = &body {
                info!("Request payload: {}", pretty(payload));
            }
        }

        let request = HttpRequest {
            method: operation.method(),
            url: url.clone(),
            headers: self.headers(&api_key),
            body,
        };

        let response = self.transport.send(request).await.map_err(|e| {
            if verbose {
                error!(operation = operation.label(), "Request failed: {}", e);
            }
            e
        })?;

        if verbose {
            info!("Response status code: {}", response.status);
            info!("Response headers: {:?}", response.headers);
            info!("Response content: {}", response.body);
        }

        classify(operation, &url, response)
    }
}

/// Map a raw response to a typed result according to the operation's policy
fn classify<R: ApiResponse>(operation: Operation, url: &str, response: HttpResponse) -> Result<R> {
    if operation.converts_status(response.status) {
        let message = api_error_message(response.status, &response.body);
        if let Some(typed) = R::from_api_error(message) {
            return Ok(typed);
        }
    }

    if response.status == 400 {
        let detail = match serde_json::from_str::<Value>(&response.body) {
            Ok(parsed) => pretty(&parsed),
            Err(_) => response.body,
        };
        error!("400 Bad Request Error: {}", detail);
        return Err(FirecrawlError::BadRequest(detail));
    }

    if !response.is_success() {
        let reason = reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        return Err(FirecrawlError::Http {
            status: response.status,
            reason,
            url: url.to_string(),
        });
    }

    Ok(serde_json::from_str(&response.body)?)
}

/// Error text for a converted 402/429/500 response
fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        },
        _ => format!("Error {}: {}", status, body),
    }
}

fn to_body<T: Serialize>(request: &T) -> Result<Value> {
    Ok(serde_json::to_value(request)?)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Shorten an API key for logs: first four characters, plus the last four
/// when the key is longer than eight.
pub fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(4).collect();
    let tail: String = if chars.len() > 8 {
        chars[chars.len() - 4..].iter().collect()
    } else {
        String::new()
    };
    format!("{}...{}", head, tail)
}
