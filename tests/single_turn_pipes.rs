//! Single-Turn Pipe Integration Tests
//!
//! End-to-end runs of the crawl, scrape and map pipes over a stubbed
//! transport.

use std::io::Write;
use std::sync::{Arc, Mutex};

use firecrawl_pipes::adapters::{FirecrawlClient, StubTransport};
use firecrawl_pipes::config::{CrawlValves, MapValves, ScrapeValves};
use firecrawl_pipes::core::{
    CrawlOperation, MapOperation, Pipe, ScrapeOperation, SingleTurnOperation, SingleTurnPipe,
};
use firecrawl_pipes::domain::Method;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn pipe<O: SingleTurnOperation>(operation: O) -> (SingleTurnPipe<O>, Arc<StubTransport>) {
    let stub = Arc::new(StubTransport::new());
    let client = FirecrawlClient::with_transport("fc-test-key-123456", stub.clone());
    (SingleTurnPipe::new(client, operation), stub)
}

/// Shared buffer the test subscriber writes formatted events into
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_scrape_end_to_end() {
    let (pipe, stub) = pipe(ScrapeOperation::new(ScrapeValves::default()));
    stub.respond_json(200, json!({"success": true, "data": {"markdown": "Hello"}}));

    let reply = pipe.pipe("https://example.com", "m", &[], &json!({})).await;

    assert_eq!(reply, "### Extracted Content\n\nHello\n\n");

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "https://api.firecrawl.dev/v1/scrape");
    assert_eq!(
        requests[0].header("authorization"),
        Some("Bearer fc-test-key-123456")
    );

    let body = requests[0].body.clone().unwrap();
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["formats"], json!(["markdown"]));
    assert_eq!(body["onlyMainContent"], true);
    assert_eq!(body["proxy"], "basic");
    assert!(body.get("includeTags").is_none());
}

#[tokio::test]
async fn test_scrape_with_metadata_and_links() {
    let (pipe, stub) = pipe(ScrapeOperation::default());
    stub.respond_json(
        200,
        json!({
            "success": true,
            "data": {
                "markdown": "# Docs",
                "metadata": {"title": "Docs", "description": "All the docs", "sourceURL": "https://x.com"},
                "links": ["https://x.com/a"]
            }
        }),
    );

    let reply = pipe.pipe("scrape https://x.com.", "m", &[], &json!({})).await;

    assert!(reply.starts_with("### Extracted Content\n\n# Docs\n\n### Metadata\n\n"));
    assert!(reply.contains("**Title:** Docs\n\n**Description:** All the docs\n\n"));
    assert!(reply.ends_with("### Links Found\n\n1. https://x.com/a\n"));
    assert_eq!(stub.requests()[0].body.as_ref().unwrap()["url"], "https://x.com");
}

#[tokio::test]
async fn test_crawl_uses_valves() {
    let (pipe, stub) = pipe(CrawlOperation::new(CrawlValves {
        max_depth: 5,
        url_limit: 20,
        exclude_paths: "/admin".to_string(),
        ..Default::default()
    }));
    stub.respond_json(200, json!({"success": false, "id": "cr-1"}));

    let reply = pipe.pipe("https://example.com/blog", "m", &[], &json!({})).await;

    assert_eq!(
        reply,
        "Crawl job started with ID: cr-1. Status: failed\n\nTo check the status later, ask: 'Check status of cr-1'"
    );
    let body = stub.requests()[0].body.clone().unwrap();
    assert_eq!(body["url"], "https://example.com/blog");
    assert_eq!(body["maxDepth"], 5);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["excludePaths"], json!(["/admin"]));
    assert!(body.get("includePaths").is_none());
}

#[tokio::test]
async fn test_crawl_status_lists_pages() {
    let (pipe, stub) = pipe(CrawlOperation::default());
    stub.respond_json(
        200,
        json!({
            "status": "completed",
            "total": 1,
            "completed": 1,
            "creditsUsed": 1,
            "data": [{"markdown": "x", "metadata": {"title": "Home", "sourceURL": "https://example.com"}}]
        }),
    );

    let reply = pipe.pipe("check status of cr-1", "m", &[], &json!({})).await;

    assert!(reply.starts_with("Crawl job status: completed\n\nTotal URLs: 1\n"));
    assert!(reply.ends_with("1. Home - https://example.com\n"));
}

#[tokio::test]
async fn test_map_without_results() {
    let (pipe, stub) = pipe(MapOperation::new(MapValves {
        include_subdomains: true,
        ..Default::default()
    }));
    stub.respond_json(200, json!({"success": true, "links": []}));

    let reply = pipe.pipe("map https://example.com", "m", &[], &json!({})).await;

    assert_eq!(
        reply,
        "Found 0 URLs on https://example.com.\n\nList of mapped URLs:\nNothing was found []"
    );
    let body = stub.requests()[0].body.clone().unwrap();
    assert_eq!(body["includeSubdomains"], true);
    assert!(body.get("search").is_none());
}

#[tokio::test]
async fn test_api_key_can_be_replaced_from_chat() {
    let (pipe, stub) = pipe(ScrapeOperation::default());

    let reply = pipe.pipe("set api key fc-new-key-999", "m", &[], &json!({})).await;
    assert_eq!(reply, "API key has been updated. First 4 characters: fc-n...");

    stub.respond_json(200, json!({"success": true, "data": {"markdown": "ok"}}));
    pipe.pipe("https://example.com", "m", &[], &json!({})).await;
    assert_eq!(
        stub.requests()[0].header("Authorization"),
        Some("Bearer fc-new-key-999")
    );
}

#[tokio::test]
async fn test_bad_request_is_reported() {
    let (pipe, stub) = pipe(ScrapeOperation::default());
    stub.respond_json(400, json!({"error": "invalid url"}));

    let reply = pipe.pipe("https://example.com", "m", &[], &json!({})).await;

    assert!(reply.starts_with("Error during scrape operation: API returned 400 Bad Request:"));
    assert!(reply.contains("invalid url"));
}

#[tokio::test]
async fn test_debug_mode_logs_under_default_filter() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (pipe, stub) = pipe(ScrapeOperation::default());
    stub.respond_json(200, json!({"success": true, "data": {"markdown": "quiet"}}));
    pipe.pipe("https://example.com/quiet", "m", &[], &json!({})).await;
    assert!(!logs.contents().contains("Request payload"));

    pipe.pipe("debug on", "m", &[], &json!({})).await;
    stub.respond_json(200, json!({"success": true, "data": {"markdown": "loud"}}));
    pipe.pipe("https://example.com/loud", "m", &[], &json!({})).await;

    let output = logs.contents();
    assert!(output.contains("Request payload"));
    assert!(output.contains("https://example.com/loud"));
    assert!(output.contains("Response status code: 200"));
    assert!(output.contains("Response content"));
    assert!(output.contains("fc-t...3456"));
    assert!(!output.contains("fc-test-key-123456"));
}
