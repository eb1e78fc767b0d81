//! Single-turn pipes: crawl, scrape and map.
//!
//! Each message is handled on its own. After the shared preflight the pipe
//! pulls a URL out of the message, builds a request from its valves, sends it,
//! and renders the response. Crawl additionally answers job-status requests.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::intent::{
    extract_job_id, extract_search_term, extract_url, is_status_request, parse_actions,
    parse_formats, parse_headers, parse_list, parse_location, JobKind,
};
use super::pipe::{error_reply, log_startup, preflight, trace_invocation, Pipe, Preflight};
use super::render;
use crate::adapters::{FirecrawlClient, Result};
use crate::config::{CrawlValves, MapValves, ScrapeValves};
use crate::domain::{ChatMessage, CrawlRequest, MapRequest, ScrapeOptions, ScrapeRequest};

/// What a single-turn pipe does with a URL
#[async_trait]
pub trait SingleTurnOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn welcome(&self) -> &'static str;

    /// Operation word used in error replies ("crawl", "scrape", "map")
    fn verb(&self) -> &'static str;

    /// Reply when the message carries no URL
    fn missing_url(&self) -> &'static str;

    /// Answer a job-status request, if this operation has jobs
    async fn status(&self, _client: &FirecrawlClient, _message: &str) -> Option<String> {
        None
    }

    /// Run the operation against `url` and render the response
    async fn run(&self, client: &FirecrawlClient, url: &str, message: &str) -> Result<String>;
}

/// A pipe that runs one operation per message
pub struct SingleTurnPipe<O> {
    client: FirecrawlClient,
    operation: O,
}

pub type CrawlPipe = SingleTurnPipe<CrawlOperation>;
pub type ScrapePipe = SingleTurnPipe<ScrapeOperation>;
pub type MapPipe = SingleTurnPipe<MapOperation>;

impl<O: SingleTurnOperation> SingleTurnPipe<O> {
    pub fn new(client: FirecrawlClient, operation: O) -> Self {
        Self { client, operation }
    }

    pub fn client(&self) -> &FirecrawlClient {
        &self.client
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }
}

#[async_trait]
impl<O: SingleTurnOperation> Pipe for SingleTurnPipe<O> {
    fn name(&self) -> &str {
        self.operation.name()
    }

    async fn on_startup(&self) {
        log_startup(self.name(), &self.client);
    }

    async fn on_shutdown(&self) {
        debug!("on_shutdown:{}", self.name());
    }

    async fn pipe(
        &self,
        user_message: &str,
        model_id: &str,
        _messages: &[ChatMessage],
        body: &Value,
    ) -> String {
        trace_invocation(&self.client, user_message, model_id, body);

        match preflight(&self.client, user_message, body) {
            Preflight::Title => return self.name().to_string(),
            Preflight::Greeting => return self.operation.welcome().to_string(),
            Preflight::Reply(reply) => return reply,
            Preflight::Proceed => {}
        }

        if let Some(reply) = self.operation.status(&self.client, user_message).await {
            return reply;
        }

        let Some(url) = extract_url(user_message) else {
            return self.operation.missing_url().to_string();
        };
        if self.client.debug() {
            info!("Extracted URL from message: {}", url);
        }

        match self.operation.run(&self.client, &url, user_message).await {
            Ok(reply) => reply,
            Err(e) => error_reply(
                &format!("Error during {} operation", self.operation.verb()),
                e,
                self.client.debug(),
            ),
        }
    }
}

// =============================================================================
// Crawl
// =============================================================================

const CRAWL_WELCOME: &str = "👋 Hello! Welcome to the Firecrawl Web Crawling Pipeline.\n\n\
You can type the URL of a website you want to crawl, and I'll extract its content for you.\n\n\
For example: https://example.com\n\n\
To check the status of a previous crawl job, type: check status of [job-id]\n\n\
Happy crawling! 🕸️";

/// Starts site crawls and reports crawl-job status
#[derive(Debug, Clone, Default)]
pub struct CrawlOperation {
    pub valves: CrawlValves,
}

impl CrawlOperation {
    pub fn new(valves: CrawlValves) -> Self {
        Self { valves }
    }

    pub fn request(&self, url: &str) -> CrawlRequest {
        let v = &self.valves;
        CrawlRequest {
            url: url.to_string(),
            exclude_paths: parse_list(&v.exclude_paths),
            include_paths: parse_list(&v.include_paths),
            max_depth: v.max_depth,
            ignore_sitemap: v.ignore_sitemap,
            ignore_query_parameters: v.ignore_query_params,
            limit: v.url_limit,
            allow_backward_links: v.allow_backward_links,
            allow_external_links: v.allow_external_links,
            scrape_options: ScrapeOptions {
                formats: vec![v.default_format.clone()],
                only_main_content: v.only_main_content,
                wait_for: v.wait_for,
                mobile: v.mobile,
                timeout: v.timeout,
                remove_base64_images: v.remove_base64_images,
                block_ads: v.block_ads,
                location: None,
            },
        }
    }
}

#[async_trait]
impl SingleTurnOperation for CrawlOperation {
    fn name(&self) -> &'static str {
        "Firecrawl Web Crawling Pipeline"
    }

    fn welcome(&self) -> &'static str {
        CRAWL_WELCOME
    }

    fn verb(&self) -> &'static str {
        "crawl"
    }

    fn missing_url(&self) -> &'static str {
        "No URL found in your message. Please provide a valid URL to crawl or a crawl ID to check status."
    }

    async fn status(&self, client: &FirecrawlClient, message: &str) -> Option<String> {
        let job_id = extract_job_id(message, JobKind::Crawl)?;
        if !is_status_request(message) {
            return None;
        }

        if client.debug() {
            info!("Checking status for crawl ID: {}", job_id);
        }

        let reply = match client.crawl_status(&job_id).await {
            Ok(response) => match response.error.as_deref() {
                Some(error) if !error.is_empty() => format!("Error getting crawl status: {}", error),
                _ => render::crawl_status(&response),
            },
            Err(e) => error_reply("Error getting crawl status", e, client.debug()),
        };
        Some(reply)
    }

    async fn run(&self, client: &FirecrawlClient, url: &str, _message: &str) -> Result<String> {
        let request = self.request(url);
        let response = client.crawl(&request).await?;
        Ok(render::crawl_started(&response))
    }
}

// =============================================================================
// Scrape
// =============================================================================

const SCRAPE_WELCOME: &str = "👋 Hello! Welcome to the Firecrawl Web Scraping Pipeline.\n\n\
You can type the URL of a website you want to scrape, and I'll extract its content for you.\n\n\
For example: https://example.com\n\n\
Happy scraping! 🕸️";

/// Scrapes a single page
#[derive(Debug, Clone, Default)]
pub struct ScrapeOperation {
    pub valves: ScrapeValves,
}

impl ScrapeOperation {
    pub fn new(valves: ScrapeValves) -> Self {
        Self { valves }
    }

    pub fn request(&self, url: &str) -> ScrapeRequest {
        let v = &self.valves;
        let proxy = v.proxy.trim();
        ScrapeRequest {
            formats: parse_formats(&v.formats),
            only_main_content: v.only_main_content,
            include_tags: parse_list(&v.include_tags),
            exclude_tags: parse_list(&v.exclude_tags),
            headers: parse_headers(&v.headers),
            wait_for: v.wait_for,
            mobile: v.mobile,
            timeout: v.timeout,
            actions: parse_actions(&v.actions),
            location: parse_location(&v.location_country, &v.location_languages),
            remove_base64_images: v.remove_base64_images,
            block_ads: v.block_ads,
            proxy: (!proxy.is_empty()).then(|| proxy.to_string()),
            ..ScrapeRequest::new(url)
        }
    }

    /// The format shown in the reply
    pub fn primary_format(&self) -> String {
        parse_formats(&self.valves.formats).remove(0)
    }
}

#[async_trait]
impl SingleTurnOperation for ScrapeOperation {
    fn name(&self) -> &'static str {
        "Firecrawl Web Scraping Pipeline"
    }

    fn welcome(&self) -> &'static str {
        SCRAPE_WELCOME
    }

    fn verb(&self) -> &'static str {
        "scrape"
    }

    fn missing_url(&self) -> &'static str {
        "No URL found in your message. Please provide a valid URL to scrape."
    }

    async fn run(&self, client: &FirecrawlClient, url: &str, _message: &str) -> Result<String> {
        let request = self.request(url);
        let response = client.scrape(&request).await?;

        if let Some(error) = response.error.as_deref().filter(|e| !e.is_empty()) {
            return Ok(format!("Error during scrape operation: {}", error));
        }

        Ok(render::scrape_result(&response, &self.primary_format()))
    }
}

// =============================================================================
// Map
// =============================================================================

const MAP_WELCOME: &str = "👋 Hello! Welcome to the Firecrawl URL Mapping Pipeline.\n\n\
You can type the URL of a website you want to map, and I'll list the URLs I find on it.\n\n\
For example: https://example.com\n\n\
To narrow the results, add a search term: https://example.com search for \"docs\"\n\n\
Happy mapping! 🕸️";

/// Lists the URLs of a site
#[derive(Debug, Clone, Default)]
pub struct MapOperation {
    pub valves: MapValves,
}

impl MapOperation {
    pub fn new(valves: MapValves) -> Self {
        Self { valves }
    }

    pub fn request(&self, url: &str, search: &str) -> MapRequest {
        MapRequest {
            url: url.to_string(),
            search: search.to_string(),
            ignore_sitemap: self.valves.ignore_sitemap,
            sitemap_only: self.valves.sitemap_only,
            include_subdomains: self.valves.include_subdomains,
            limit: self.valves.url_limit,
        }
    }
}

#[async_trait]
impl SingleTurnOperation for MapOperation {
    fn name(&self) -> &'static str {
        "Firecrawl URL Mapping Pipeline"
    }

    fn welcome(&self) -> &'static str {
        MAP_WELCOME
    }

    fn verb(&self) -> &'static str {
        "map"
    }

    fn missing_url(&self) -> &'static str {
        "No URL found in your message. Please provide a valid URL to map."
    }

    async fn run(&self, client: &FirecrawlClient, url: &str, message: &str) -> Result<String> {
        let search = extract_search_term(message);
        let request = self.request(url, &search);
        let response = client.map(&request).await?;

        if client.debug() {
            info!("Received map response with {} URLs", response.links.len());
        }

        if let Some(error) = response.error.as_deref().filter(|e| !e.is_empty()) {
            return Ok(format!("Error during map operation: {}", error));
        }

        Ok(render::map_result(&response, url, &search))
    }
}
